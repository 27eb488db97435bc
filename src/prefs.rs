//! Per-browser UI preferences kept in a small key-value store.
//!
//! Keys follow the layout the web front end used in local storage:
//! `browser_{id}_format`, `browser_{id}_depth`, `browser_{id}_filter` and
//! `barspot_browser_{id}` (folder pane width).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::browser::item::DisplayFormat;
use crate::error::Result;

/// Client-local key-value storage.
pub trait PrefStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Volatile store, used when nothing should touch disk.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: HashMap<String, String>,
}

impl PrefStore for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct JsonFilePrefs {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFilePrefs {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next write.
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!("ignoring malformed preferences file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Default location under the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("genbrowse").join("prefs.json"))
    }
}

impl PrefStore for JsonFilePrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

pub fn format_key(id: &str) -> String {
    format!("browser_{}_format", id)
}

pub fn depth_key(id: &str) -> String {
    format!("browser_{}_depth", id)
}

pub fn filter_key(id: &str) -> String {
    format!("browser_{}_filter", id)
}

pub fn pane_width_key(id: &str) -> String {
    format!("barspot_browser_{}", id)
}

/// Typed view of the preferences of one browser instance.
pub struct BrowserPrefs {
    id: String,
    store: Box<dyn PrefStore>,
}

impl BrowserPrefs {
    pub fn new(id: &str, store: Box<dyn PrefStore>) -> Self {
        Self {
            id: id.to_string(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> Option<DisplayFormat> {
        self.store
            .get(&format_key(&self.id))
            .and_then(|v| DisplayFormat::parse(&v))
    }

    pub fn depth(&self) -> Option<u32> {
        self.store
            .get(&depth_key(&self.id))
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn filter(&self) -> Option<String> {
        self.store.get(&filter_key(&self.id))
    }

    pub fn pane_width(&self) -> Option<u16> {
        self.store
            .get(&pane_width_key(&self.id))
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn set_format(&mut self, format: DisplayFormat) {
        self.write(&format_key(&self.id), format.label());
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.write(&depth_key(&self.id), &depth.to_string());
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.write(&filter_key(&self.id), filter);
    }

    pub fn set_pane_width(&mut self, width: u16) {
        self.write(&pane_width_key(&self.id), &width.to_string());
    }

    // Preference writes never interrupt browsing; failures are only logged.
    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!("failed to persist preference {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_browser_id() {
        assert_eq!(format_key("images"), "browser_images_format");
        assert_eq!(depth_key("images"), "browser_images_depth");
        assert_eq!(filter_key("images"), "browser_images_filter");
        assert_eq!(pane_width_key("images"), "barspot_browser_images");
    }

    #[test]
    fn typed_values_round_trip_through_memory() {
        let mut prefs = BrowserPrefs::new("models", Box::new(MemoryPrefs::default()));
        assert!(prefs.format().is_none());
        prefs.set_format(DisplayFormat::BigThumbnails);
        prefs.set_depth(4);
        prefs.set_filter("cat");
        prefs.set_pane_width(42);
        assert_eq!(prefs.format(), Some(DisplayFormat::BigThumbnails));
        assert_eq!(prefs.depth(), Some(4));
        assert_eq!(prefs.filter().as_deref(), Some("cat"));
        assert_eq!(prefs.pane_width(), Some(42));
    }

    #[test]
    fn garbage_values_are_ignored() {
        let mut store = MemoryPrefs::default();
        store.set("browser_x_depth", "deep").unwrap();
        store.set("browser_x_format", "Huge").unwrap();
        let prefs = BrowserPrefs::new("x", Box::new(store));
        assert!(prefs.depth().is_none());
        assert!(prefs.format().is_none());
    }

    #[test]
    fn json_file_persists_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = JsonFilePrefs::open(&path);
        store.set("browser_a_filter", "dog").unwrap();

        let reopened = JsonFilePrefs::open(&path);
        assert_eq!(reopened.get("browser_a_filter").as_deref(), Some("dog"));
    }

    #[test]
    fn malformed_json_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFilePrefs::open(&path);
        assert!(store.get("anything").is_none());
    }
}
