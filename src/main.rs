mod app;
mod components;
mod describe;
mod event;
mod handler;
mod palette;
mod tui;
mod ui;
mod view;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use genpage_browser::config::{AppConfig, BrowserConfig, GeneralConfig, WatcherConfig};
use genpage_browser::error::{self, BrowserError};
use genpage_browser::fs::watcher::{self, FsWatcher};
use genpage_browser::prefs::{JsonFilePrefs, MemoryPrefs, PrefStore};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::app::App;
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// Terminal browser for generated image output folders.
#[derive(Parser, Debug)]
#[command(name = "genbrowse", version, about)]
struct Cli {
    /// Output folder to browse (defaults to config default_path, then the
    /// current directory)
    path: Option<PathBuf>,

    /// Browser id used to key stored preferences
    #[arg(long)]
    id: Option<String>,

    /// Folder listing depth (1-10)
    #[arg(long)]
    depth: Option<u32>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    /// Config overrides carried by the flags.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                browser_id: self.id.clone(),
                ..Default::default()
            },
            browser: BrowserConfig {
                default_depth: self.depth,
                ..Default::default()
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn log_dir(cli: &Cli) -> PathBuf {
    cli.log_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .map(|d| d.join("genbrowse").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    })
}

fn open_prefs() -> Box<dyn PrefStore> {
    match JsonFilePrefs::default_path() {
        Some(path) => Box::new(JsonFilePrefs::open(&path)),
        None => {
            warn!("no data directory, preferences will not persist");
            Box::new(MemoryPrefs::default())
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    // The terminal belongs to the TUI, so logs only go to a daily file.
    let dir = log_dir(&cli);
    std::fs::create_dir_all(&dir).ok();
    let file_appender = tracing_appender::rolling::daily(&dir, "genbrowse.log");
    let (file_nb, _log_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    let requested = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = requested.canonicalize().map_err(|_| {
        BrowserError::InvalidPath(format!("{} does not exist", requested.display()))
    })?;
    info!(path = %path.display(), id = config.browser_id(), "genbrowse starting");

    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();
    let mut app = App::new(&config, &path, open_prefs(), &event_tx);

    let _watcher = if !app.watcher_active {
        None
    } else {
        let ignore_patterns: Vec<String> = watcher::DEFAULT_IGNORE_PATTERNS
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tx = event_tx.clone();

        match FsWatcher::new(
            &path,
            Duration::from_millis(config.debounce_ms()),
            ignore_patterns,
            watcher::DEFAULT_FLOOD_THRESHOLD,
            move |paths| {
                let _ = tx.send(Event::FsChange(paths));
            },
        ) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!("watcher unavailable: {}", e);
                app.watcher_active = false;
                app.set_status(format!("Watcher unavailable: {}", e), true);
                None
            }
        }
    };

    let (width, _) = tui.size()?;
    app.start(width);

    loop {
        tui.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Tick => app.tick(),
            Event::Resize(width, _) => app.handle_resize(width),
            Event::Browser(event) => app.handle_browser_event(event),
            Event::FsChange(paths) => app.handle_fs_change(paths),
            Event::OpenFolder(folder) => app.open_folder(&folder),
            Event::Notice(text) => app.set_status(text, false),
        }

        // Sync watcher pause/resume state
        if let Some(ref w) = _watcher {
            if app.watcher_active && !w.is_active() {
                w.resume();
            } else if !app.watcher_active && w.is_active() {
                w.pause();
            }
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    info!("genbrowse exiting");
    Ok(())
}
