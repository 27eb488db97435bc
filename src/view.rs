//! Renderer that keeps a drawable snapshot of the browser for the TUI.

use std::time::Instant;

use genpage_browser::browser::path::Crumb;
use genpage_browser::browser::{
    BrowserView, DisplayFormat, FlatNode, Item, LayoutMode, PageButton, Renderer, SortMethod,
};
use genpage_browser::error::BrowserError;
use tracing::debug;

/// A visible row of the folder tree.
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub node: FlatNode,
    pub highlighted: bool,
}

/// A rendered content entry.
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub name: String,
    pub label: String,
    pub description: String,
    pub buttons: Vec<String>,
    pub selected: bool,
}

/// Everything the UI draws, captured at the last build.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub folder: String,
    pub crumbs: Vec<Crumb>,
    pub tree_rows: Vec<TreeRow>,
    pub entries: Vec<ContentRow>,
    /// Entries held back until more chunks are loaded.
    pub deferred: usize,
    pub page_buttons: Vec<PageButton>,
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_len: usize,
    pub total_items: usize,
    pub format: DisplayFormat,
    pub mode: LayoutMode,
    pub depth: u32,
    pub sort: SortMethod,
    pub filter: String,
    pub is_loading: bool,
}

impl Snapshot {
    pub fn from_view(view: &BrowserView<'_>) -> Self {
        let tree_rows = view
            .tree
            .flatten()
            .into_iter()
            .map(|node| TreeRow {
                highlighted: view.is_highlighted(&node.full_path),
                node,
            })
            .collect();
        let entries = view
            .eager_entries()
            .iter()
            .map(|e| ContentRow {
                name: e.item.name.clone(),
                label: e.description.label().to_string(),
                description: e.description.description.clone(),
                buttons: e.description.buttons.iter().map(|b| b.label.clone()).collect(),
                selected: view.selected == Some(e.item.name.as_str()),
            })
            .collect();

        Self {
            folder: view.folder.to_string(),
            crumbs: view.crumbs(),
            tree_rows,
            entries,
            deferred: view.plan.deferred_len(),
            page_buttons: view.pages.buttons(),
            current_page: view.pages.current_page(),
            total_pages: view.pages.total_pages(),
            filtered_len: view.pages.filtered_len(),
            total_items: view.pages.all_items().len(),
            format: view.format,
            mode: view.mode,
            depth: view.depth,
            sort: view.pages.sort(),
            filter: view.pages.filter().to_string(),
            is_loading: view.is_loading,
        }
    }
}

/// A transient status bar message.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

#[derive(Debug, Default)]
pub struct TuiRenderer {
    pub snapshot: Snapshot,
    pub status: Option<StatusMessage>,
    pub selected_item: Option<Item>,
}

impl TuiRenderer {
    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
            created: Instant::now(),
        });
    }

    /// Clear the status message once it has been shown for 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some(status) = &self.status {
            if status.created.elapsed().as_secs() > 3 {
                self.status = None;
            }
        }
    }
}

impl Renderer for TuiRenderer {
    fn build(&mut self, view: &BrowserView<'_>) {
        self.snapshot = Snapshot::from_view(view);
    }

    fn select(&mut self, item: &Item) {
        self.set_status(format!("Selected {}", item.name), false);
        self.selected_item = Some(item.clone());
    }

    fn folder_selected(&mut self, path: &str) {
        debug!(path, "folder opened from tree");
    }

    fn fetch_failed(&mut self, _path: &str, error: &BrowserError) {
        self.set_status(error.to_string(), true);
    }
}
