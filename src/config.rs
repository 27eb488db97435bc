//! Configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--id`, `--depth`, `--no-watcher`)
//! 2. `$GENBROWSE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.genbrowse.toml` in the current working directory
//! 4. Global `~/.config/genbrowse/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::browser::controller::{
    BrowserOptions, DEFAULT_DEPTH, DEFAULT_FILTER_DEBOUNCE, DEFAULT_NAV_DEBOUNCE,
    DEFAULT_QUIESCENCE,
};
use crate::browser::item::DisplayFormat;
use crate::browser::paging::{SortMethod, DEFAULT_ITEMS_PER_PAGE, DEFAULT_MAX_PRE_BUILD};
use crate::fs::listing::DEFAULT_EXTENSIONS;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Output folder to browse (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Browser id, used to key stored preferences.
    pub browser_id: Option<String>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Browser behaviour.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BrowserConfig {
    /// Display format used until the user picks one, e.g. "Thumbnails".
    pub default_format: Option<String>,
    /// Listing depth used until the user picks one.
    pub default_depth: Option<u32>,
    pub items_per_page: Option<usize>,
    /// Sort order: "name" or "date".
    pub sort_by: Option<String>,
    /// List files as leaves in the folder tree.
    pub show_files_in_tree: Option<bool>,
    /// Entries rendered before the rest is deferred.
    pub max_pre_build: Option<usize>,
    /// Terminals narrower than this use the paged mobile layout.
    pub mobile_width: Option<u16>,
    /// File extensions listed as items.
    pub extensions: Option<Vec<String>>,
    pub show_hidden: Option<bool>,
}

/// Timing of coalescing and debouncing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimingConfig {
    pub quiescence_ms: Option<u64>,
    pub nav_debounce_ms: Option<u64>,
    pub filter_debounce_ms: Option<u64>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Refresh the browser when the output folder changes.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub watcher: WatcherConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_BROWSER_ID: &str = "outputs";
/// Default width below which the mobile layout is used.
pub const DEFAULT_MOBILE_WIDTH: u16 = 80;
/// Default watcher debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

// ── Config file locator ──────────────────────────────────────────────────────

/// Candidate config file paths in priority order, excluding `--config`.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("GENBROWSE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".genbrowse.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("genbrowse").join("config.toml"));
    }

    paths
}

/// Read and parse a TOML config file. Missing files yield `None`; files
/// that fail to parse are logged and skipped.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!("failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                browser_id: other.general.browser_id.clone().or(self.general.browser_id),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            browser: BrowserConfig {
                default_format: other
                    .browser
                    .default_format
                    .clone()
                    .or(self.browser.default_format),
                default_depth: other.browser.default_depth.or(self.browser.default_depth),
                items_per_page: other.browser.items_per_page.or(self.browser.items_per_page),
                sort_by: other.browser.sort_by.clone().or(self.browser.sort_by),
                show_files_in_tree: other
                    .browser
                    .show_files_in_tree
                    .or(self.browser.show_files_in_tree),
                max_pre_build: other.browser.max_pre_build.or(self.browser.max_pre_build),
                mobile_width: other.browser.mobile_width.or(self.browser.mobile_width),
                extensions: other.browser.extensions.clone().or(self.browser.extensions),
                show_hidden: other.browser.show_hidden.or(self.browser.show_hidden),
            },
            timing: TimingConfig {
                quiescence_ms: other.timing.quiescence_ms.or(self.timing.quiescence_ms),
                nav_debounce_ms: other.timing.nav_debounce_ms.or(self.timing.nav_debounce_ms),
                filter_debounce_ms: other
                    .timing
                    .filter_debounce_ms
                    .or(self.timing.filter_debounce_ms),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher ones overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn browser_id(&self) -> &str {
        self.general.browser_id.as_deref().unwrap_or(DEFAULT_BROWSER_ID)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Configured default format; unknown names fall back to the built-in one.
    pub fn default_format(&self) -> DisplayFormat {
        match self.browser.default_format.as_deref() {
            Some(name) => DisplayFormat::parse(name).unwrap_or_else(|| {
                warn!("unknown display format '{}' in config", name);
                DisplayFormat::default()
            }),
            None => DisplayFormat::default(),
        }
    }

    pub fn default_depth(&self) -> u32 {
        self.browser.default_depth.unwrap_or(DEFAULT_DEPTH)
    }

    pub fn items_per_page(&self) -> usize {
        self.browser.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE)
    }

    pub fn sort_by(&self) -> SortMethod {
        SortMethod::from_str(self.browser.sort_by.as_deref().unwrap_or("name"))
    }

    pub fn show_files_in_tree(&self) -> bool {
        self.browser.show_files_in_tree.unwrap_or(false)
    }

    pub fn max_pre_build(&self) -> usize {
        self.browser.max_pre_build.unwrap_or(DEFAULT_MAX_PRE_BUILD)
    }

    pub fn mobile_width(&self) -> u16 {
        self.browser.mobile_width.unwrap_or(DEFAULT_MOBILE_WIDTH)
    }

    pub fn extensions(&self) -> Vec<String> {
        match &self.browser.extensions {
            Some(exts) => exts.clone(),
            None => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn show_hidden(&self) -> bool {
        self.browser.show_hidden.unwrap_or(false)
    }

    pub fn quiescence(&self) -> Duration {
        self.timing
            .quiescence_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUIESCENCE)
    }

    pub fn nav_debounce(&self) -> Duration {
        self.timing
            .nav_debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_NAV_DEBOUNCE)
    }

    pub fn filter_debounce(&self) -> Duration {
        self.timing
            .filter_debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FILTER_DEBOUNCE)
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    /// Watcher debounce interval in milliseconds.
    pub fn debounce_ms(&self) -> u64 {
        self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    /// Browser settings derived from this configuration.
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            id: self.browser_id().to_string(),
            default_format: self.default_format(),
            default_depth: self.default_depth(),
            items_per_page: self.items_per_page(),
            sort: self.sort_by(),
            show_files_in_tree: self.show_files_in_tree(),
            max_pre_build: self.max_pre_build(),
            quiescence: self.quiescence(),
            nav_debounce: self.nav_debounce(),
            filter_debounce: self.filter_debounce(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
