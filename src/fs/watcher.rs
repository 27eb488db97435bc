use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tracing::warn;

/// Default patterns to ignore when watching the output folder.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[".git", ".thumbs", ".cache", "__pycache__"];

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default flood threshold (events per debounce window).
pub const DEFAULT_FLOOD_THRESHOLD: usize = 100;

/// Filesystem watcher that reports changed paths below a root directory.
pub struct FsWatcher {
    /// Whether the watcher is currently forwarding events.
    active: Arc<AtomicBool>,
    /// Handle to the debouncer (dropped to stop watching).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl FsWatcher {
    /// Watch `root` recursively and hand each debounced batch of changed
    /// paths to `on_change`.
    ///
    /// Paths matching any of `ignore_patterns` are dropped. A batch larger
    /// than `flood_threshold` is collapsed into the root path alone.
    pub fn new<F>(
        root: &Path,
        debounce_duration: Duration,
        ignore_patterns: Vec<String>,
        flood_threshold: usize,
        on_change: F,
    ) -> notify::Result<Self>
    where
        F: Fn(Vec<PathBuf>) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let active_clone = active.clone();
        let root_path = root.to_path_buf();

        let mut debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                if !active_clone.load(Ordering::Relaxed) {
                    return;
                }

                match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path.clone())
                            .filter(|p| !should_ignore(p, &ignore_patterns))
                            .collect();

                        if let Some(batch) = collapse_flood(paths, flood_threshold, &root_path) {
                            on_change(batch);
                        }
                    }
                    Err(e) => warn!("filesystem watcher error: {}", e),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(root, notify::RecursiveMode::Recursive)?;

        Ok(Self {
            active,
            _debouncer: debouncer,
        })
    }

    /// Pause event forwarding (watcher stays alive to avoid re-creating inotify watches).
    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Resume event forwarding.
    pub fn resume(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Apply flood protection to a batch: empty batches are dropped, oversized
/// ones become a single root entry.
pub fn collapse_flood(paths: Vec<PathBuf>, threshold: usize, root: &Path) -> Option<Vec<PathBuf>> {
    if paths.is_empty() {
        None
    } else if paths.len() > threshold {
        Some(vec![root.to_path_buf()])
    } else {
        Some(paths)
    }
}

/// A path is ignored if any of its components matches a pattern exactly.
pub fn should_ignore(path: &Path, patterns: &[String]) -> bool {
    path.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            patterns.iter().any(|p| *p == name)
        }
        _ => false,
    })
}

/// Browser folder containing `changed`, relative to `root`.
pub fn affected_folder(root: &Path, changed: &Path) -> Option<String> {
    let rel = changed.strip_prefix(root).ok()?;
    let parent = if changed.is_dir() { Some(rel) } else { rel.parent() };
    let folder = parent
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();
    Some(folder)
}
