//! Listing source backed by a local output folder.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::browser::item::Item;
use crate::browser::path;
use crate::browser::source::{Listing, ListingSource};
use crate::error::{BrowserError, Result};

/// File extensions listed when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "mp4", "webm", "mov",
];

/// Which directory entries become items.
#[derive(Debug, Clone)]
struct EntryFilter {
    extensions: Vec<String>,
    show_hidden: bool,
}

impl EntryFilter {
    fn skips(&self, name: &str) -> bool {
        !self.show_hidden && name.starts_with('.')
    }

    fn accepts_file(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match Path::new(name).extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

/// Lists folders below a root directory.
///
/// Results are cached per `(path, depth)` until a forced refresh or
/// [`invalidate`](FsListingSource::invalidate).
#[derive(Debug)]
pub struct FsListingSource {
    root: PathBuf,
    filter: EntryFilter,
    cache: Mutex<HashMap<(String, u32), Listing>>,
}

impl FsListingSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            filter: EntryFilter {
                extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
                show_hidden: false,
            },
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Restrict items to these extensions (case-insensitive). An empty list
    /// accepts every file.
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.filter.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_hidden(mut self, show_hidden: bool) -> Self {
        self.filter.show_hidden = show_hidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Drop cached listings that can see `folder`: the folder, its ancestors
    /// (deep listings include it) and its descendants.
    pub fn invalidate_folder(&self, folder: &str) {
        let folder = path::normalize(folder);
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|(cached, _), _| !contains(cached, folder) && !contains(folder, cached));
        }
    }

    fn cached(&self, key: &(String, u32)) -> Option<Listing> {
        self.cache.lock().ok().and_then(|c| c.get(key).cloned())
    }

    fn store(&self, key: (String, u32), listing: &Listing) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, listing.clone());
        }
    }
}

/// Whether `inner` is `outer` or lies below it.
fn contains(outer: &str, inner: &str) -> bool {
    outer.is_empty()
        || inner == outer
        || inner.strip_prefix(outer).is_some_and(|rest| rest.starts_with('/'))
}

/// Reject paths that could escape the root.
fn validate(rel: &str) -> Result<()> {
    if rel.contains('\\') {
        return Err(BrowserError::InvalidPath(rel.to_string()));
    }
    if path::segments(rel).any(|s| s == ".." || s == ".") {
        return Err(BrowserError::InvalidPath(rel.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ListingSource for FsListingSource {
    async fn list(&self, rel: &str, force_refresh: bool, depth: u32) -> Result<Listing> {
        validate(path::normalize(rel))?;
        let rel = path::normalize(rel).to_string();
        let key = (rel.clone(), depth);
        if !force_refresh {
            if let Some(listing) = self.cached(&key) {
                debug!(path = %rel, depth, "listing served from cache");
                return Ok(listing);
            }
        }

        let root = self.root.clone();
        let filter = self.filter.clone();
        let scan_rel = rel.clone();
        let listing = tokio::task::spawn_blocking(move || scan_folder(&root, &scan_rel, depth, &filter))
            .await
            .map_err(|e| BrowserError::fetch_failed(&rel, e))??;
        debug!(path = %rel, depth, folders = listing.folders.len(), items = listing.items.len(), "listed folder");
        self.store(key, &listing);
        Ok(listing)
    }
}

fn scan_folder(root: &Path, rel: &str, depth: u32, filter: &EntryFilter) -> Result<Listing> {
    let dir = if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    };
    if !dir.is_dir() {
        return Err(BrowserError::NotFound(rel.to_string()));
    }

    let mut listing = Listing::default();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if filter.skips(&name) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_folders(&entry.path(), &name, depth.saturating_sub(1), filter, &mut listing.folders)?;
        } else if file_type.is_file() && filter.accepts_file(&name) {
            let mut item = Item::new(path::join(rel, &name));
            if let Ok(meta) = entry.metadata() {
                if let Ok(modified) = meta.modified() {
                    item = item.with_date(modified);
                }
                item = item.with_data(json!({ "size": meta.len() }));
            }
            listing.items.push(item);
        }
    }
    listing.folders.sort();
    listing.items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

fn collect_folders(
    dir: &Path,
    prefix: &str,
    remaining: u32,
    filter: &EntryFilter,
    out: &mut Vec<String>,
) -> Result<()> {
    out.push(prefix.to_string());
    if remaining == 0 {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if filter.skips(&name) || !entry.file_type()?.is_dir() {
            continue;
        }
        collect_folders(&entry.path(), &path::join(prefix, &name), remaining - 1, filter, out)?;
    }
    Ok(())
}
