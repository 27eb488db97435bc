use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::browser::item::Item;
use crate::browser::path;
use crate::error::Result;

/// One folder level (or depth-limited subtree) as returned by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Subfolder names relative to the listed path; deeper folders contain
    /// slashes (`sub/inner`).
    pub folders: Vec<String>,
    /// File records, named relative to the listing root.
    pub items: Vec<Item>,
}

/// Provides folder contents to a browser.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// List `path` down to `depth` levels. `force_refresh` bypasses any
    /// caching the source does on its own.
    async fn list(&self, path: &str, force_refresh: bool, depth: u32) -> Result<Listing>;
}

/// List `path`, descending into subfolders when the folder itself holds no
/// items, one level at a time up to `depth` levels. Each folder is listed at
/// most once, even when a deep listing reports it both directly and through
/// its parent.
pub(crate) async fn list_with_descent(
    source: &dyn ListingSource,
    path: &str,
    force_refresh: bool,
    depth: u32,
) -> Result<Listing> {
    let mut listing = source.list(path, force_refresh, depth).await?;
    let mut visited = HashSet::new();
    let mut frontier: Vec<String> = listing
        .folders
        .iter()
        .filter(|f| visited.insert(f.to_string()))
        .cloned()
        .collect();
    let mut level = 0;

    while listing.items.is_empty() && !frontier.is_empty() && level < depth {
        debug!(path, level, folders = frontier.len(), "descending into subfolders for items");
        let mut next = Vec::new();
        for folder in &frontier {
            let sub = source
                .list(&path::join(path, folder), false, depth - level)
                .await?;
            listing.items.extend(sub.items);
            next.extend(
                sub.folders
                    .iter()
                    .map(|f| path::join(folder, f))
                    .filter(|f| visited.insert(f.clone())),
            );
        }
        frontier = next;
        level += 1;
    }
    Ok(listing)
}
