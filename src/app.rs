use std::path::{Path, PathBuf};
use std::sync::Arc;

use genpage_browser::browser::path;
use genpage_browser::browser::{BrowserController, BrowserEvent, LayoutMode};
use genpage_browser::config::AppConfig;
use genpage_browser::fs::listing::FsListingSource;
use genpage_browser::fs::watcher::affected_folder;
use genpage_browser::prefs::{BrowserPrefs, PrefStore};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::components::content::entry_height;
use crate::describe::output_describer;
use crate::event::{forward_browser_events, Event};
use crate::view::{ContentRow, TreeRow, TuiRenderer};

/// Folder pane width (percent of the screen) until the user resizes it.
pub const DEFAULT_PANE_WIDTH: u16 = 30;
const MIN_PANE_WIDTH: u16 = 15;
const MAX_PANE_WIDTH: u16 = 70;

/// Which pane receives cursor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Tree,
    Content,
}

/// What typed characters are fed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Filter,
    PageJump,
}

/// Screen regions recorded while drawing, for mouse hit testing.
#[derive(Debug, Clone, Default)]
pub struct ScreenLayout {
    pub tree: Rect,
    pub content: Rect,
    /// Column span and route of each clickable crumb in the header.
    pub crumbs: Vec<(u16, u16, String)>,
    pub header_row: u16,
}

/// Main application state.
pub struct App {
    pub browser: BrowserController<TuiRenderer>,
    pub source: Arc<FsListingSource>,
    pub root: PathBuf,
    pub focus: Focus,
    pub input_mode: InputMode,
    pub input: String,
    pub tree_cursor: usize,
    pub tree_scroll: usize,
    pub content_cursor: usize,
    pub content_scroll: usize,
    pub mobile_width: u16,
    pub watcher_active: bool,
    pub should_quit: bool,
    pub layout: ScreenLayout,
}

impl App {
    /// Create the app for the output folder at `root`. Browser events are
    /// forwarded into `events`. Nothing is listed until [`App::start`].
    pub fn new(
        config: &AppConfig,
        root: &Path,
        store: Box<dyn PrefStore>,
        events: &mpsc::UnboundedSender<Event>,
    ) -> Self {
        let source = Arc::new(
            FsListingSource::new(root)
                .with_extensions(&config.extensions())
                .with_hidden(config.show_hidden()),
        );
        let (browser_tx, browser_rx) = mpsc::unbounded_channel();
        forward_browser_events(browser_rx, events.clone());

        let options = config.browser_options();
        let prefs = BrowserPrefs::new(&options.id, store);
        let browser = BrowserController::new(
            options,
            source.clone(),
            Box::new(output_describer(events.clone())),
            TuiRenderer::default(),
            prefs,
            browser_tx,
        );

        Self {
            browser,
            source,
            root: root.to_path_buf(),
            focus: Focus::Tree,
            input_mode: InputMode::Normal,
            input: String::new(),
            tree_cursor: 0,
            tree_scroll: 0,
            content_cursor: 0,
            content_scroll: 0,
            mobile_width: config.mobile_width(),
            watcher_active: config.watcher_enabled(),
            should_quit: false,
            layout: ScreenLayout::default(),
        }
    }

    /// Pick the layout for a terminal `width` columns wide and list the root.
    pub fn start(&mut self, width: u16) {
        info!(root = %self.root.display(), "starting browser");
        self.handle_resize(width);
        self.browser.navigate("");
    }

    pub fn renderer(&self) -> &TuiRenderer {
        self.browser.renderer()
    }

    pub fn tree_rows(&self) -> &[TreeRow] {
        &self.browser.renderer().snapshot.tree_rows
    }

    pub fn entries(&self) -> &[ContentRow] {
        &self.browser.renderer().snapshot.entries
    }

    pub fn is_mobile(&self) -> bool {
        self.browser.layout_mode() == LayoutMode::Mobile
    }

    pub fn pane_width(&self) -> u16 {
        self.browser.pane_width().unwrap_or(DEFAULT_PANE_WIDTH)
    }

    /// Pane the cursor keys act on; mobile has no tree pane.
    pub fn effective_focus(&self) -> Focus {
        if self.is_mobile() {
            Focus::Content
        } else {
            self.focus
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.browser.renderer_mut().set_status(text, is_error);
    }

    // ── Events ────────────────────────────────────────────────────────────

    pub fn handle_browser_event(&mut self, event: BrowserEvent) {
        self.browser.handle_event(event);
        self.clamp_cursors();
    }

    pub fn handle_resize(&mut self, width: u16) {
        let mode = LayoutMode::detect(width, self.mobile_width, false);
        self.browser.set_layout_mode(mode);
        self.clamp_cursors();
    }

    /// Output folder changed on disk: drop cached listings and ask for a
    /// coalesced update.
    pub fn handle_fs_change(&mut self, paths: Vec<PathBuf>) {
        if !self.watcher_active {
            return;
        }
        let mut touched = false;
        for changed in &paths {
            match affected_folder(&self.root, changed) {
                Some(folder) => {
                    debug!(folder = %folder, "output folder changed");
                    self.source.invalidate_folder(&folder);
                    touched = true;
                }
                None => debug!(path = %changed.display(), "change outside root ignored"),
            }
        }
        if touched {
            self.browser.request_update_coalesced();
        }
    }

    pub fn toggle_watcher(&mut self) {
        self.watcher_active = !self.watcher_active;
        let msg = if self.watcher_active {
            "Watcher resumed"
        } else {
            "Watcher paused"
        };
        self.set_status(msg, false);
    }

    pub fn tick(&mut self) {
        self.browser.renderer_mut().clear_expired_status();
    }

    fn clamp_cursors(&mut self) {
        let rows = self.tree_rows().len();
        self.tree_cursor = self.tree_cursor.min(rows.saturating_sub(1));
        let entries = self.entries().len();
        self.content_cursor = self.content_cursor.min(entries.saturating_sub(1));
    }

    // ── Cursor movement ──────────────────────────────────────────────────

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Content,
            Focus::Content => Focus::Tree,
        };
    }

    pub fn select_next(&mut self) {
        self.move_cursor(1);
    }

    pub fn select_previous(&mut self) {
        self.move_cursor(-1);
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.effective_focus() {
            Focus::Tree => (&mut self.tree_cursor, self.browser.renderer().snapshot.tree_rows.len()),
            Focus::Content => (&mut self.content_cursor, self.browser.renderer().snapshot.entries.len()),
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    /// Keep the cursor of a pane `height` rows tall on screen.
    pub fn update_scroll(&mut self, focus: Focus, height: usize) {
        let (cursor, scroll) = match focus {
            Focus::Tree => (self.tree_cursor, &mut self.tree_scroll),
            Focus::Content => (self.content_cursor, &mut self.content_scroll),
        };
        if height == 0 {
            return;
        }
        if cursor < *scroll {
            *scroll = cursor;
        } else if cursor >= *scroll + height {
            *scroll = cursor + 1 - height;
        }
    }

    // ── Browser actions ──────────────────────────────────────────────────

    /// Enter on the focused row: folders open, files are selected.
    pub fn activate_selected(&mut self) {
        let result = match self.effective_focus() {
            Focus::Tree => match self.tree_rows().get(self.tree_cursor) {
                Some(row) => {
                    let target = row.node.full_path.clone();
                    self.browser.activate(&target)
                }
                None => return,
            },
            Focus::Content => match self.entries().get(self.content_cursor) {
                Some(entry) => {
                    let name = entry.name.clone();
                    self.browser.select(&name)
                }
                None => return,
            },
        };
        if let Err(e) = result {
            self.set_status(e.to_string(), true);
        }
        self.clamp_cursors();
    }

    /// Toggle the focused folder open or closed, as a click on its marker.
    pub fn toggle_selected(&mut self) {
        let Some(row) = self.tree_rows().get(self.tree_cursor) else {
            return;
        };
        if row.node.is_file {
            return;
        }
        let target = row.node.full_path.clone();
        if let Err(e) = self.browser.toggle_folder(&target, true) {
            self.set_status(e.to_string(), true);
        }
        self.clamp_cursors();
    }

    pub fn go_up(&mut self) {
        let parent = path::parent(self.browser.folder()).to_string();
        self.browser.navigate_debounced(&parent);
    }

    pub fn go_to(&mut self, route: &str) {
        self.browser.navigate_debounced(route);
    }

    pub fn open_folder(&mut self, folder: &str) {
        self.browser.navigate(folder);
        self.content_cursor = 0;
    }

    pub fn refresh(&mut self) {
        self.source.invalidate();
        self.browser.refresh();
        self.set_status("Refreshing...", false);
    }

    /// Run button `index` of the focused content entry.
    pub fn press_button(&mut self, index: usize) {
        let Some(entry) = self.entries().get(self.content_cursor) else {
            return;
        };
        let name = entry.name.clone();
        if let Err(e) = self.browser.press_button(&name, index) {
            self.set_status(e.to_string(), true);
        }
    }

    pub fn cycle_sort(&mut self) {
        let next = self.browser.pages().sort().next();
        self.browser.set_sort(next);
    }

    pub fn reverse_items(&mut self) {
        self.browser.reverse_items();
    }

    pub fn cycle_format(&mut self) {
        let next = self.browser.format().next();
        self.browser.set_format(next);
    }

    pub fn adjust_depth(&mut self, delta: i32) {
        let depth = (self.browser.depth() as i32 + delta).max(1) as u32;
        self.browser.set_depth(depth);
    }

    pub fn next_page(&mut self) {
        if self.browser.next_page() {
            self.content_cursor = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.browser.prev_page() {
            self.content_cursor = 0;
        }
    }

    pub fn load_more(&mut self) {
        if self.renderer().snapshot.deferred > 0 {
            self.browser.load_more();
        }
    }

    pub fn toggle_layout(&mut self) {
        let mode = match self.browser.layout_mode() {
            LayoutMode::Desktop => LayoutMode::Mobile,
            LayoutMode::Mobile => LayoutMode::Desktop,
        };
        self.browser.set_layout_mode(mode);
        self.clamp_cursors();
    }

    pub fn adjust_pane_width(&mut self, delta: i16) {
        let width = (i32::from(self.pane_width()) + i32::from(delta))
            .clamp(i32::from(MIN_PANE_WIDTH), i32::from(MAX_PANE_WIDTH));
        self.browser.set_pane_width(u16::try_from(width).unwrap_or(DEFAULT_PANE_WIDTH));
    }

    // ── Text input ───────────────────────────────────────────────────────

    pub fn begin_filter(&mut self) {
        self.input = self.browser.pages().filter().to_string();
        self.input_mode = InputMode::Filter;
    }

    pub fn begin_page_jump(&mut self) {
        self.input.clear();
        self.input_mode = InputMode::PageJump;
    }

    pub fn input_char(&mut self, c: char) {
        match self.input_mode {
            InputMode::Filter => {
                self.input.push(c);
                self.apply_filter();
            }
            InputMode::PageJump if c.is_ascii_digit() => self.input.push(c),
            _ => {}
        }
    }

    pub fn input_backspace(&mut self) {
        self.input.pop();
        if self.input_mode == InputMode::Filter {
            self.apply_filter();
        }
    }

    fn apply_filter(&mut self) {
        let text = self.input.clone();
        self.browser.set_filter(&text);
        self.content_cursor = 0;
    }

    /// Enter in an input line.
    pub fn confirm_input(&mut self) {
        if self.input_mode == InputMode::PageJump {
            match self.input.parse::<usize>() {
                Ok(page) if self.browser.set_page(page) => self.content_cursor = 0,
                _ => {
                    let msg = format!("No page {}", self.input);
                    self.set_status(msg, true);
                }
            }
        }
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    /// Esc in an input line. A filter typed so far stays applied.
    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    // ── Mouse ────────────────────────────────────────────────────────────

    /// Left click at a screen cell.
    pub fn click(&mut self, column: u16, row: u16) {
        if row == self.layout.header_row {
            let route = self
                .layout
                .crumbs
                .iter()
                .find(|(start, end, _)| column >= *start && column < *end)
                .map(|(_, _, route)| route.clone());
            if let Some(route) = route {
                self.go_to(&route);
            }
            return;
        }

        if contains(self.layout.tree, column, row) && !self.is_mobile() {
            let index = self.tree_scroll + (row - self.layout.tree.y - 1) as usize;
            let Some(node) = self.tree_rows().get(index).map(|r| r.node.clone()) else {
                return;
            };
            self.focus = Focus::Tree;
            self.tree_cursor = index;
            let marker = self.layout.tree.x + 1 + 3 * node.depth as u16;
            if column == marker && node.is_expandable {
                self.toggle_selected();
            } else {
                self.activate_selected();
            }
        } else if contains(self.layout.content, column, row) {
            let height = entry_height(self.browser.format());
            let index = self.content_scroll + ((row - self.layout.content.y - 1) / height) as usize;
            if index < self.entries().len() {
                self.focus = Focus::Content;
                self.content_cursor = index;
                self.activate_selected();
            }
        }
    }
}

/// Whether the inner area (inside a one-cell border) of `area` holds the cell.
fn contains(area: Rect, column: u16, row: u16) -> bool {
    column > area.x
        && column + 1 < area.x + area.width
        && row > area.y
        && row + 1 < area.y + area.height
}
