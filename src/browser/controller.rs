//! Navigation and update state machine of one browser instance.
//!
//! Listing fetches run as spawned tasks and report back through a channel as
//! [`BrowserEvent`]s, which the owner feeds into
//! [`BrowserController::handle_event`]. All state lives in the controller and
//! is only touched from the owner's event loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::item::{Describe, DisplayFormat, Item, ItemDescription};
use crate::browser::paging::{
    PageState, RenderPlan, SortMethod, DEFAULT_ITEMS_PER_PAGE, DEFAULT_MAX_PRE_BUILD,
};
use crate::browser::path::{self, Crumb};
use crate::browser::source::{list_with_descent, Listing, ListingSource};
use crate::browser::timer::DebounceTimer;
use crate::browser::tree::BrowserTree;
use crate::error::{BrowserError, Result};
use crate::prefs::BrowserPrefs;

/// How long a pending update absorbs further update requests.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_secs(5);
/// Delay applied to path header and up-folder clicks.
pub const DEFAULT_NAV_DEBOUNCE: Duration = Duration::from_millis(300);
/// Delay between the last filter keystroke and the follow-up update request.
pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_DEPTH: u32 = 3;
pub const MAX_DEPTH: u32 = 10;

/// Which layout the renderer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Desktop,
    Mobile,
}

impl LayoutMode {
    /// Narrow viewports and touch devices get the mobile layout.
    pub fn detect(width: u16, threshold: u16, touch: bool) -> Self {
        if touch || width < threshold {
            LayoutMode::Mobile
        } else {
            LayoutMode::Desktop
        }
    }
}

/// Events posted back to the controller by its own background work.
#[derive(Debug)]
pub enum BrowserEvent {
    /// A listing fetch finished.
    Listed {
        generation: u64,
        path: String,
        result: Result<Listing>,
    },
    /// A debounced navigation is due.
    NavigateDue(String),
    /// Filter typing went quiet.
    FilterSettled,
}

/// Update state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    UpdatePending { since: Instant },
    UpdatePendingWithQueuedRetrigger { since: Instant },
}

/// Work to run once the pending update has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FollowUp {
    ReopenPath(String),
    ContinueReopen,
}

/// Segments still to be opened while restoring a path after a refresh.
#[derive(Debug)]
struct ReopenTask {
    opened: String,
    remaining: VecDeque<String>,
}

/// Receives the browser state for presentation.
pub trait Renderer {
    fn build(&mut self, view: &BrowserView<'_>);

    /// A leaf item was picked.
    fn select(&mut self, _item: &Item) {}

    /// A folder was clicked open.
    fn folder_selected(&mut self, _path: &str) {}

    /// A listing could not be fetched.
    fn fetch_failed(&mut self, _path: &str, _error: &BrowserError) {}
}

/// A described item ready to render.
#[derive(Debug)]
pub struct Entry<'a> {
    pub item: &'a Item,
    pub description: ItemDescription,
}

/// Snapshot handed to the renderer on every build.
#[derive(Debug)]
pub struct BrowserView<'a> {
    pub id: &'a str,
    pub folder: &'a str,
    pub selected: Option<&'a str>,
    pub tree: &'a BrowserTree,
    pub pages: &'a PageState,
    pub format: DisplayFormat,
    pub mode: LayoutMode,
    pub depth: u32,
    pub is_loading: bool,
    /// Entries for the current mode: the page slice on mobile, the whole
    /// filtered list on desktop.
    pub entries: Vec<Entry<'a>>,
    pub plan: RenderPlan,
}

impl<'a> BrowserView<'a> {
    pub fn crumbs(&self) -> Vec<Crumb> {
        path::breadcrumbs(self.folder)
    }

    /// Whether the tree row for `path` should be highlighted.
    pub fn is_highlighted(&self, path: &str) -> bool {
        let target = self.selected.unwrap_or(self.folder);
        path::normalize(target) == path::normalize(path)
    }

    /// Entries to render right away.
    pub fn eager_entries(&self) -> &[Entry<'a>] {
        &self.entries[self.plan.eager.clone()]
    }
}

/// Static settings of a browser instance.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub id: String,
    pub default_format: DisplayFormat,
    pub default_depth: u32,
    pub items_per_page: usize,
    pub sort: SortMethod,
    pub show_files_in_tree: bool,
    pub max_pre_build: usize,
    pub quiescence: Duration,
    pub nav_debounce: Duration,
    pub filter_debounce: Duration,
}

impl BrowserOptions {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            default_format: DisplayFormat::default(),
            default_depth: DEFAULT_DEPTH,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            sort: SortMethod::default(),
            show_files_in_tree: false,
            max_pre_build: DEFAULT_MAX_PRE_BUILD,
            quiescence: DEFAULT_QUIESCENCE,
            nav_debounce: DEFAULT_NAV_DEBOUNCE,
            filter_debounce: DEFAULT_FILTER_DEBOUNCE,
        }
    }
}

/// Browser controller: owns the tree cache and paging state and drives the
/// listing source and renderer.
pub struct BrowserController<R: Renderer> {
    options: BrowserOptions,
    source: Arc<dyn ListingSource>,
    describe: Box<dyn Describe>,
    renderer: R,
    prefs: BrowserPrefs,
    events: mpsc::UnboundedSender<BrowserEvent>,
    tree: BrowserTree,
    pages: PageState,
    folder: String,
    selected: Option<String>,
    depth: u32,
    format: DisplayFormat,
    mode: LayoutMode,
    pane_width: Option<u16>,
    state: UpdateState,
    generation: u64,
    in_flight: Option<CancellationToken>,
    follow_up: Option<FollowUp>,
    reopen: Option<ReopenTask>,
    chunks_loaded: usize,
    ever_loaded: bool,
    nav_timer: DebounceTimer,
    filter_timer: DebounceTimer,
}

impl<R: Renderer> BrowserController<R> {
    /// Create a browser, restoring format, depth, filter and pane width from
    /// `prefs`. Nothing is fetched until the first navigation.
    pub fn new(
        options: BrowserOptions,
        source: Arc<dyn ListingSource>,
        describe: Box<dyn Describe>,
        renderer: R,
        prefs: BrowserPrefs,
        events: mpsc::UnboundedSender<BrowserEvent>,
    ) -> Self {
        let format = prefs.format().unwrap_or(options.default_format);
        let depth = prefs
            .depth()
            .unwrap_or(options.default_depth)
            .clamp(1, MAX_DEPTH);
        let filter = prefs.filter().unwrap_or_default();
        let pane_width = prefs.pane_width();

        let mut pages = PageState::new(options.items_per_page);
        pages.set_filter(&filter);
        pages.set_sort(options.sort);

        let nav_timer = DebounceTimer::new(options.nav_debounce);
        let filter_timer = DebounceTimer::new(options.filter_debounce);

        Self {
            options,
            source,
            describe,
            renderer,
            prefs,
            events,
            tree: BrowserTree::new(),
            pages,
            folder: String::new(),
            selected: None,
            depth,
            format,
            mode: LayoutMode::default(),
            pane_width,
            state: UpdateState::Idle,
            generation: 0,
            in_flight: None,
            follow_up: None,
            reopen: None,
            chunks_loaded: 0,
            ever_loaded: false,
            nav_timer,
            filter_timer,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn tree(&self) -> &BrowserTree {
        &self.tree
    }

    pub fn pages(&self) -> &PageState {
        &self.pages
    }

    pub fn format(&self) -> DisplayFormat {
        self.format
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn pane_width(&self) -> Option<u16> {
        self.pane_width
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn is_update_pending(&self) -> bool {
        !matches!(self.state, UpdateState::Idle)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ever_loaded(&self) -> bool {
        self.ever_loaded
    }

    pub fn prefs(&self) -> &BrowserPrefs {
        &self.prefs
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Show `folder`: clears the selection and fetches its listing.
    pub fn navigate(&mut self, folder: &str) {
        self.navigate_with(folder, None);
    }

    fn navigate_with(&mut self, folder: &str, follow_up: Option<FollowUp>) {
        self.chunks_loaded = 0;
        self.folder = path::normalize(folder).to_string();
        self.selected = None;
        self.pages.set_page(1);
        self.update(false, follow_up);
    }

    /// Navigate after the click debounce; a newer request replaces an older
    /// one still waiting.
    pub fn navigate_debounced(&mut self, folder: &str) {
        let folder = path::normalize(folder).to_string();
        self.nav_timer
            .schedule(&self.events, BrowserEvent::NavigateDue(folder));
    }

    /// Navigate to the parent of the current folder.
    pub fn navigate_up(&mut self) {
        let parent = path::parent(&self.folder).to_string();
        self.navigate(&parent);
    }

    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        path::breadcrumbs(&self.folder)
    }

    /// Discard the tree cache, refetch the current folder bypassing source
    /// caches, then reopen the folder's path segment by segment.
    pub fn refresh(&mut self) {
        let path = self.folder.clone();
        self.reopen = None;
        self.update(true, Some(FollowUp::ReopenPath(path)));
    }

    /// Request an update, folding it into the pending one if that started
    /// less than the quiescence window ago. Returns whether a fetch started.
    pub fn request_update_coalesced(&mut self) -> bool {
        match self.state {
            UpdateState::UpdatePending { since }
            | UpdateState::UpdatePendingWithQueuedRetrigger { since }
                if since.elapsed() < self.options.quiescence =>
            {
                debug!(browser = %self.options.id, "update pending, queueing retrigger");
                self.state = UpdateState::UpdatePendingWithQueuedRetrigger { since };
                false
            }
            _ => {
                self.update(false, None);
                true
            }
        }
    }

    fn update(&mut self, is_refresh: bool, follow_up: Option<FollowUp>) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
        if is_refresh {
            self.tree = BrowserTree::closed();
            self.chunks_loaded = 0;
        }
        self.state = UpdateState::UpdatePending {
            since: Instant::now(),
        };
        self.follow_up = follow_up;

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        let source = Arc::clone(&self.source);
        let tx = self.events.clone();
        let generation = self.generation;
        let path = self.folder.clone();
        let depth = self.depth;
        debug!(browser = %self.options.id, generation, path = %path, is_refresh, "starting listing");

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = list_with_descent(source.as_ref(), &path, is_refresh, depth) => result,
            };
            let _ = tx.send(BrowserEvent::Listed {
                generation,
                path,
                result,
            });
        });
    }

    /// Feed back an event produced by this controller's background work.
    pub fn handle_event(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::Listed {
                generation,
                path,
                result,
            } => self.finish_update(generation, &path, result),
            BrowserEvent::NavigateDue(path) => self.navigate(&path),
            BrowserEvent::FilterSettled => {
                self.request_update_coalesced();
            }
        }
    }

    fn finish_update(&mut self, generation: u64, path: &str, result: Result<Listing>) {
        if generation != self.generation {
            debug!(browser = %self.options.id, generation, current = self.generation, "discarding stale listing");
            return;
        }
        self.in_flight = None;
        let queued = matches!(
            self.state,
            UpdateState::UpdatePendingWithQueuedRetrigger { .. }
        );
        self.state = UpdateState::Idle;
        let follow_up = self.follow_up.take();

        match result {
            Ok(listing) => {
                self.pages.set_items(listing.items);
                self.pages.recompute(false);
                self.build(Some(listing.folders.as_slice()));
                self.ever_loaded = true;
                match follow_up {
                    Some(FollowUp::ReopenPath(target)) => self.begin_reopen(&target),
                    Some(FollowUp::ContinueReopen) => self.advance_reopen(),
                    None => {}
                }
            }
            Err(e) => {
                warn!(browser = %self.options.id, path, "listing failed: {}", e);
                self.reopen = None;
                self.renderer.fetch_failed(path, &e);
            }
        }

        if queued && matches!(self.state, UpdateState::Idle) {
            debug!(browser = %self.options.id, "running queued retrigger");
            self.update(false, None);
        }
    }

    fn begin_reopen(&mut self, target: &str) {
        self.reopen = Some(ReopenTask {
            opened: String::new(),
            remaining: path::segments(target).map(str::to_string).collect(),
        });
        self.advance_reopen();
    }

    /// Open the next closed node on the reopen path. Each opening navigates,
    /// and the completion of that navigation resumes here.
    fn advance_reopen(&mut self) {
        let Some(mut task) = self.reopen.take() else {
            return;
        };
        if !self.tree.root().is_open {
            self.reopen = Some(task);
            self.open_and_navigate("");
            return;
        }
        while let Some(segment) = task.remaining.pop_front() {
            let next = path::join(&task.opened, &segment);
            let is_open = match self.tree.folder_from_path(&next) {
                Ok(node) => node.is_open,
                Err(_) => {
                    debug!(browser = %self.options.id, path = %next, "reopen path vanished");
                    return;
                }
            };
            task.opened = next;
            if !is_open {
                let target = task.opened.clone();
                self.reopen = Some(task);
                self.open_and_navigate(&target);
                return;
            }
        }
    }

    fn open_and_navigate(&mut self, path: &str) {
        if let Some(node) = self.tree.node_mut(path) {
            node.has_opened = true;
            node.is_open = true;
        }
        self.renderer.folder_selected(path);
        self.navigate_with(path, Some(FollowUp::ContinueReopen));
    }

    // ── Tree and item interaction ────────────────────────────────────────

    /// Click on a folder row: opens it (or toggles it when only the expand
    /// symbol was hit) and navigates there.
    pub fn toggle_folder(&mut self, path: &str, symbol_only: bool) -> Result<()> {
        let path = path::normalize(path).to_string();
        let node = self
            .tree
            .node_mut(&path)
            .ok_or_else(|| BrowserError::NotFound(path.clone()))?;
        node.has_opened = true;
        node.is_open = if symbol_only { !node.is_open } else { true };
        self.renderer.folder_selected(&path);
        self.navigate(&path);
        Ok(())
    }

    /// Click on a tree row: file leaves are selected, folders opened.
    pub fn activate(&mut self, path: &str) -> Result<()> {
        let is_file = self.tree.folder_from_path(path)?.is_file();
        if is_file {
            self.select(path)
        } else {
            self.toggle_folder(path, false)
        }
    }

    /// Select the item at `path`, from a tree leaf or the listed items.
    pub fn select(&mut self, path: &str) -> Result<()> {
        let path = path::normalize(path);
        let from_tree = self
            .tree
            .folder_from_path(path)
            .ok()
            .and_then(|node| node.file_data.clone());
        let item = from_tree
            .or_else(|| self.pages.find(path).cloned())
            .ok_or_else(|| BrowserError::NotFound(path.to_string()))?;
        self.selected = Some(item.name.clone());
        self.renderer.select(&item);
        self.rebuild();
        Ok(())
    }

    /// Run the action of button `index` of the item at `path`.
    pub fn press_button(&mut self, path: &str, index: usize) -> Result<()> {
        let item = self
            .pages
            .find(path::normalize(path))
            .ok_or_else(|| BrowserError::NotFound(path.to_string()))?;
        let description = self.describe.describe(item);
        let button = description
            .buttons
            .get(index)
            .ok_or_else(|| BrowserError::NotFound(format!("{} button {}", path, index)))?;
        if let Some(action) = &button.on_click {
            action(item);
        }
        Ok(())
    }

    // ── View settings ────────────────────────────────────────────────────

    /// Set the filter text, persist it and re-render; once typing settles an
    /// update is requested.
    pub fn set_filter(&mut self, text: &str) {
        let filter = text.to_lowercase();
        self.prefs.set_filter(&filter);
        self.pages.set_filter(&filter);
        self.pages.recompute(false);
        self.rebuild();
        self.filter_timer
            .schedule(&self.events, BrowserEvent::FilterSettled);
    }

    pub fn set_sort(&mut self, sort: SortMethod) {
        self.pages.set_sort(sort);
        self.pages.recompute(false);
        self.rebuild();
    }

    /// Reverse the order of the full item set.
    pub fn reverse_items(&mut self) {
        self.pages.recompute(true);
        self.rebuild();
    }

    /// Jump to `page`; out-of-range pages are refused.
    pub fn set_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.pages.total_pages() {
            return false;
        }
        self.pages.set_page(page);
        self.pages.recompute(false);
        self.rebuild();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.pages.current_page() + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.pages.current_page().saturating_sub(1))
    }

    /// Render one more deferred chunk of entries.
    pub fn load_more(&mut self) {
        self.chunks_loaded += 1;
        self.rebuild();
    }

    pub fn set_format(&mut self, format: DisplayFormat) {
        self.format = format;
        self.prefs.set_format(format);
        self.rebuild();
    }

    /// Change the listing depth (clamped to 1..=10) and refetch.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth.clamp(1, MAX_DEPTH);
        self.prefs.set_depth(self.depth);
        self.update(false, None);
    }

    pub fn set_pane_width(&mut self, width: u16) {
        self.pane_width = Some(width);
        self.prefs.set_pane_width(width);
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if self.mode != mode {
            self.mode = mode;
            self.rebuild();
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────

    /// Re-render from the current state without fetching.
    pub fn rebuild(&mut self) {
        self.build(None);
    }

    fn build(&mut self, folders: Option<&[String]>) {
        if let Some(folders) = folders {
            self.tree.merge_listing(&self.folder, folders, None);
            if self.options.show_files_in_tree {
                self.tree.attach_files(&self.folder, self.pages.all_items());
            }
        }

        let filter = self.pages.filter();
        let candidates: Vec<&Item> = match self.mode {
            LayoutMode::Mobile => self.pages.page_items().collect(),
            LayoutMode::Desktop => self.pages.filtered().collect(),
        };
        let entries: Vec<Entry<'_>> = candidates
            .into_iter()
            .map(|item| Entry {
                item,
                description: self.describe.describe(item),
            })
            .filter(|e| filter.is_empty() || e.description.searchable.to_lowercase().contains(filter))
            .collect();
        let plan = match self.mode {
            LayoutMode::Mobile => RenderPlan::all(entries.len()),
            LayoutMode::Desktop => {
                RenderPlan::new(entries.len(), self.options.max_pre_build, self.chunks_loaded)
            }
        };

        let view = BrowserView {
            id: &self.options.id,
            folder: &self.folder,
            selected: self.selected.as_deref(),
            tree: &self.tree,
            pages: &self.pages,
            format: self.format,
            mode: self.mode,
            depth: self.depth,
            is_loading: !matches!(self.state, UpdateState::Idle),
            entries,
            plan,
        };
        self.renderer.build(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::item::ItemButton;
    use crate::prefs::{MemoryPrefs, PrefStore};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    struct ScriptedSource {
        listings: HashMap<String, Listing>,
        failing: HashSet<String>,
        failing_once: Mutex<HashSet<String>>,
        calls: Mutex<Vec<(String, bool)>>,
        gate: Semaphore,
    }

    impl ScriptedSource {
        fn new(listings: Vec<(&str, Listing)>) -> Self {
            Self {
                listings: listings
                    .into_iter()
                    .map(|(p, l)| (p.to_string(), l))
                    .collect(),
                failing: HashSet::new(),
                failing_once: Mutex::new(HashSet::new()),
                calls: Mutex::new(Vec::new()),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            }
        }

        fn gated(mut self) -> Self {
            self.gate = Semaphore::new(0);
            self
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }

        fn failing_once(self, path: &str) -> Self {
            self.failing_once.lock().unwrap().insert(path.to_string());
            self
        }

        fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListingSource for ScriptedSource {
        async fn list(&self, path: &str, force_refresh: bool, _depth: u32) -> Result<Listing> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), force_refresh));
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| BrowserError::fetch_failed(path, e))?;
            if self.failing.contains(path) || self.failing_once.lock().unwrap().remove(path) {
                return Err(BrowserError::fetch_failed(path, "backend offline"));
            }
            Ok(self.listings.get(path).cloned().unwrap_or_default())
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        builds: Vec<(String, Vec<String>)>,
        selected: Vec<String>,
        folders: Vec<String>,
        failures: Vec<String>,
    }

    impl Renderer for Recorder {
        fn build(&mut self, view: &BrowserView<'_>) {
            let names = view
                .eager_entries()
                .iter()
                .map(|e| e.item.name.clone())
                .collect();
            self.builds.push((view.folder.to_string(), names));
        }

        fn select(&mut self, item: &Item) {
            self.selected.push(item.name.clone());
        }

        fn folder_selected(&mut self, path: &str) {
            self.folders.push(path.to_string());
        }

        fn fetch_failed(&mut self, path: &str, _error: &BrowserError) {
            self.failures.push(path.to_string());
        }
    }

    fn listing(folders: &[&str], items: &[&str]) -> Listing {
        Listing {
            folders: folders.iter().map(|s| s.to_string()).collect(),
            items: items.iter().map(|s| Item::new(*s)).collect(),
        }
    }

    fn basic_describe() -> Box<dyn Describe> {
        Box::new(|item: &Item| ItemDescription::basic(&item.name))
    }

    fn harness_with(
        source: Arc<ScriptedSource>,
        options: BrowserOptions,
        store: MemoryPrefs,
    ) -> (
        BrowserController<Recorder>,
        mpsc::UnboundedReceiver<BrowserEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let prefs = BrowserPrefs::new(&options.id, Box::new(store));
        let browser = BrowserController::new(
            options,
            source,
            basic_describe(),
            Recorder::default(),
            prefs,
            tx,
        );
        (browser, rx)
    }

    fn harness(
        source: Arc<ScriptedSource>,
    ) -> (
        BrowserController<Recorder>,
        mpsc::UnboundedReceiver<BrowserEvent>,
    ) {
        harness_with(source, BrowserOptions::new("test"), MemoryPrefs::default())
    }

    async fn pump(
        browser: &mut BrowserController<Recorder>,
        rx: &mut mpsc::UnboundedReceiver<BrowserEvent>,
    ) {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        browser.handle_event(event);
    }

    async fn pump_until_idle(
        browser: &mut BrowserController<Recorder>,
        rx: &mut mpsc::UnboundedReceiver<BrowserEvent>,
    ) {
        for _ in 0..20 {
            if !browser.is_update_pending() {
                return;
            }
            pump(browser, rx).await;
        }
        panic!("browser never went idle");
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<BrowserEvent>) {
        let more = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(more.is_err(), "unexpected extra event");
    }

    #[tokio::test]
    async fn navigate_fetches_merges_and_renders() {
        let source = Arc::new(ScriptedSource::new(vec![(
            "",
            listing(&["a", "b"], &["x.png", "y.png"]),
        )]));
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("");
        assert!(matches!(browser.state(), UpdateState::UpdatePending { .. }));
        pump(&mut browser, &mut rx).await;

        assert_eq!(browser.state(), UpdateState::Idle);
        assert!(browser.ever_loaded());
        let builds = &browser.renderer().builds;
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].1, vec!["y.png", "x.png"]);
        let root: Vec<&String> = browser.tree().root().children.keys().collect();
        assert_eq!(root, vec!["a", "b"]);
        assert_eq!(source.calls(), vec![("".to_string(), false)]);
    }

    #[tokio::test]
    async fn coalesced_requests_trigger_one_followup_fetch() {
        let source = Arc::new(
            ScriptedSource::new(vec![("", listing(&[], &["x.png"]))]).gated(),
        );
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("");
        assert!(!browser.request_update_coalesced());
        assert!(!browser.request_update_coalesced());
        assert!(matches!(
            browser.state(),
            UpdateState::UpdatePendingWithQueuedRetrigger { .. }
        ));

        source.gate.add_permits(16);
        pump(&mut browser, &mut rx).await;
        assert!(matches!(browser.state(), UpdateState::UpdatePending { .. }));
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.state(), UpdateState::Idle);
        assert_quiet(&mut rx).await;

        assert_eq!(source.calls().len(), 2);
        assert_eq!(browser.renderer().builds.len(), 2);
    }

    #[tokio::test]
    async fn coalesced_request_when_idle_fetches_immediately() {
        let source = Arc::new(ScriptedSource::new(vec![("", listing(&[], &["x.png"]))]));
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("");
        pump(&mut browser, &mut rx).await;
        assert!(browser.request_update_coalesced());
        pump(&mut browser, &mut rx).await;
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn expired_pending_update_is_not_coalesced() {
        let source = Arc::new(
            ScriptedSource::new(vec![("", listing(&[], &["x.png"]))]).gated(),
        );
        let mut options = BrowserOptions::new("test");
        options.quiescence = Duration::ZERO;
        let (mut browser, _rx) = harness_with(source, options, MemoryPrefs::default());

        browser.navigate("");
        let before = browser.generation();
        assert!(browser.request_update_coalesced());
        assert_eq!(browser.generation(), before + 1);
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("a", listing(&["from_a"], &["a/1.png"])),
            ("b", listing(&["from_b"], &["b/1.png"])),
        ]));
        let (mut browser, mut rx) = harness(source);

        browser.navigate("a");
        let stale = browser.generation();
        browser.navigate("b");

        browser.handle_event(BrowserEvent::Listed {
            generation: stale,
            path: "a".into(),
            result: Ok(listing(&["from_a"], &["a/1.png"])),
        });
        assert!(browser.renderer().builds.is_empty());
        assert!(browser.is_update_pending());

        pump_until_idle(&mut browser, &mut rx).await;
        assert_eq!(browser.folder(), "b");
        assert!(browser.renderer().builds.iter().all(|(folder, _)| folder == "b"));
        assert!(browser.tree().folder_from_path("b/from_b").is_ok());
        assert!(browser.tree().folder_from_path("a").is_err());
    }

    #[tokio::test]
    async fn refresh_reopens_previous_path() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("", listing(&["a"], &["top.png"])),
            ("a", listing(&["b"], &["a/mid.png"])),
            ("a/b", listing(&[], &["a/b/1.png"])),
        ]));
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("a/b");
        pump(&mut browser, &mut rx).await;

        browser.refresh();
        assert!(!browser.tree().root().is_open);
        for _ in 0..4 {
            pump(&mut browser, &mut rx).await;
        }
        assert_eq!(browser.state(), UpdateState::Idle);
        assert_quiet(&mut rx).await;

        assert_eq!(browser.folder(), "a/b");
        assert!(browser.tree().root().is_open);
        assert!(browser.tree().folder_from_path("a").unwrap().is_open);
        assert!(browser.tree().folder_from_path("a/b").unwrap().is_open);
        assert_eq!(browser.renderer().folders, vec!["", "a", "a/b"]);
        assert_eq!(
            source.calls(),
            vec![
                ("a/b".to_string(), false),
                ("a/b".to_string(), true),
                ("".to_string(), false),
                ("a".to_string(), false),
                ("a/b".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced_and_returns_to_idle() {
        let source = Arc::new(ScriptedSource::new(vec![]).failing("broken"));
        let (mut browser, mut rx) = harness(source);

        browser.navigate("broken");
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.state(), UpdateState::Idle);
        assert_eq!(browser.renderer().failures, vec!["broken"]);
        assert!(browser.renderer().builds.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_still_runs_queued_retrigger_once() {
        let source = Arc::new(
            ScriptedSource::new(vec![("", listing(&[], &["x.png"]))])
                .failing_once("")
                .gated(),
        );
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("");
        assert!(!browser.request_update_coalesced());
        source.gate.add_permits(16);

        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.renderer().failures, vec![""]);
        assert!(matches!(browser.state(), UpdateState::UpdatePending { .. }));

        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.state(), UpdateState::Idle);
        assert_quiet(&mut rx).await;

        assert_eq!(source.calls().len(), 2);
        assert_eq!(browser.renderer().failures.len(), 1);
        assert_eq!(browser.renderer().builds.len(), 1);
        assert_eq!(browser.renderer().builds[0].1, vec!["x.png"]);
    }

    #[tokio::test]
    async fn failure_during_refresh_drops_the_reopen_chain() {
        let source = Arc::new(
            ScriptedSource::new(vec![
                ("", listing(&["a"], &["top.png"])),
                ("a", listing(&["b"], &["a/mid.png"])),
                ("a/b", listing(&[], &["a/b/1.png"])),
            ])
            .failing_once("a"),
        );
        let (mut browser, mut rx) = harness(source.clone());

        browser.navigate("a/b");
        pump(&mut browser, &mut rx).await;

        browser.refresh();
        for _ in 0..3 {
            pump(&mut browser, &mut rx).await;
        }
        assert_eq!(browser.state(), UpdateState::Idle);
        assert_eq!(browser.renderer().failures, vec!["a"]);
        assert_quiet(&mut rx).await;

        assert_eq!(
            source.calls(),
            vec![
                ("a/b".to_string(), false),
                ("a/b".to_string(), true),
                ("".to_string(), false),
                ("a".to_string(), false),
            ]
        );
        assert_eq!(browser.folder(), "a");
        assert_eq!(browser.renderer().folders, vec!["", "a"]);
    }

    #[tokio::test]
    async fn toggle_folder_opens_and_navigates() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("", listing(&["a"], &["x.png"])),
            ("a", listing(&[], &["a/y.png"])),
        ]));
        let (mut browser, mut rx) = harness(source);
        browser.navigate("");
        pump(&mut browser, &mut rx).await;

        browser.toggle_folder("a", false).unwrap();
        assert_eq!(browser.folder(), "a");
        assert!(browser.tree().folder_from_path("a").unwrap().is_open);
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.renderer().folders, vec!["a"]);

        browser.toggle_folder("a", true).unwrap();
        assert!(!browser.tree().folder_from_path("a").unwrap().is_open);
        pump(&mut browser, &mut rx).await;

        let err = browser.toggle_folder("missing", false).unwrap_err();
        assert!(matches!(err, BrowserError::NotFound(_)));
    }

    #[tokio::test]
    async fn select_marks_item_and_navigation_clears_it() {
        let source = Arc::new(ScriptedSource::new(vec![("", listing(&[], &["x.png"]))]));
        let (mut browser, mut rx) = harness(source);
        browser.navigate("");
        pump(&mut browser, &mut rx).await;

        browser.select("x.png").unwrap();
        assert_eq!(browser.selected(), Some("x.png"));
        assert_eq!(browser.renderer().selected, vec!["x.png"]);
        assert!(browser.select("nope.png").is_err());

        browser.navigate("");
        assert_eq!(browser.selected(), None);
    }

    #[tokio::test]
    async fn navigate_up_goes_to_parent() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let (mut browser, mut rx) = harness(source);
        browser.navigate("a/b/c");
        pump(&mut browser, &mut rx).await;
        browser.navigate_up();
        assert_eq!(browser.folder(), "a/b");
        let routes: Vec<String> = browser.breadcrumbs().into_iter().map(|c| c.route).collect();
        assert_eq!(routes, vec!["", "a", "a/b"]);
    }

    #[tokio::test]
    async fn debounced_navigation_collapses_clicks() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let mut options = BrowserOptions::new("test");
        options.nav_debounce = Duration::from_millis(20);
        let (mut browser, mut rx) = harness_with(source.clone(), options, MemoryPrefs::default());

        browser.navigate_debounced("one");
        browser.navigate_debounced("two");
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.folder(), "two");
        pump_until_idle(&mut browser, &mut rx).await;
        assert_eq!(source.calls(), vec![("two".to_string(), false)]);
    }

    #[tokio::test]
    async fn filter_is_persisted_applied_and_requests_update() {
        let source = Arc::new(ScriptedSource::new(vec![(
            "",
            listing(&[], &["Cat.png", "dog.png"]),
        )]));
        let mut options = BrowserOptions::new("test");
        options.filter_debounce = Duration::from_millis(10);
        let (mut browser, mut rx) = harness_with(source.clone(), options, MemoryPrefs::default());
        browser.navigate("");
        pump(&mut browser, &mut rx).await;

        browser.set_filter("CAT");
        assert_eq!(browser.pages().filter(), "cat");
        assert_eq!(browser.prefs().filter().as_deref(), Some("cat"));
        let last = browser.renderer().builds.last().unwrap();
        assert_eq!(last.1, vec!["Cat.png"]);

        pump(&mut browser, &mut rx).await; // FilterSettled
        pump_until_idle(&mut browser, &mut rx).await;
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn preferences_are_restored() {
        let mut store = MemoryPrefs::default();
        store.set("browser_imgs_format", "List").unwrap();
        store.set("browser_imgs_depth", "42").unwrap();
        store.set("browser_imgs_filter", "sunset").unwrap();
        store.set("barspot_browser_imgs", "30").unwrap();
        let source = Arc::new(ScriptedSource::new(vec![]));
        let (browser, _rx) = harness_with(source, BrowserOptions::new("imgs"), store);

        assert_eq!(browser.format(), DisplayFormat::List);
        assert_eq!(browser.depth(), MAX_DEPTH);
        assert_eq!(browser.pages().filter(), "sunset");
        assert_eq!(browser.pane_width(), Some(30));
    }

    #[tokio::test]
    async fn depth_change_clamps_persists_and_refetches() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let (mut browser, mut rx) = harness(source.clone());
        browser.set_depth(0);
        assert_eq!(browser.depth(), 1);
        assert_eq!(browser.prefs().depth(), Some(1));
        pump(&mut browser, &mut rx).await;
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn mobile_layout_renders_only_the_page() {
        let names: Vec<String> = (0..25).map(|i| format!("img{:02}.png", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let source = Arc::new(ScriptedSource::new(vec![("", listing(&[], &refs))]));
        let (mut browser, mut rx) = harness(source);
        browser.navigate("");
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.renderer().builds.last().unwrap().1.len(), 25);

        browser.set_layout_mode(LayoutMode::Mobile);
        assert_eq!(browser.renderer().builds.last().unwrap().1.len(), 10);

        assert!(browser.set_page(3));
        assert_eq!(browser.renderer().builds.last().unwrap().1.len(), 5);
        assert!(!browser.set_page(4));
        assert!(!browser.next_page());
        assert!(browser.prev_page());
        assert_eq!(browser.pages().current_page(), 2);
    }

    #[tokio::test]
    async fn desktop_defers_entries_beyond_pre_build() {
        let names: Vec<String> = (0..30).map(|i| format!("f{:02}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let source = Arc::new(ScriptedSource::new(vec![("", listing(&[], &refs))]));
        let mut options = BrowserOptions::new("test");
        options.max_pre_build = 10;
        let (mut browser, mut rx) = harness_with(source, options, MemoryPrefs::default());
        browser.navigate("");
        pump(&mut browser, &mut rx).await;
        assert_eq!(browser.renderer().builds.last().unwrap().1.len(), 10);

        browser.load_more();
        assert_eq!(browser.renderer().builds.last().unwrap().1.len(), 15);
    }

    #[tokio::test]
    async fn files_shown_in_tree_are_selectable_leaves() {
        let source = Arc::new(ScriptedSource::new(vec![(
            "pics",
            listing(&["old"], &["pics/cat.png"]),
        )]));
        let mut options = BrowserOptions::new("test");
        options.show_files_in_tree = true;
        let (mut browser, mut rx) = harness_with(source, options, MemoryPrefs::default());
        browser.navigate("pics");
        pump(&mut browser, &mut rx).await;

        let pics = browser.tree().folder_from_path("pics").unwrap();
        let children: Vec<&String> = pics.children.keys().collect();
        assert_eq!(children, vec!["cat.png", "old"]);

        browser.activate("pics/cat.png").unwrap();
        assert_eq!(browser.selected(), Some("pics/cat.png"));
    }

    #[tokio::test]
    async fn button_actions_run_against_item() {
        let pressed = Arc::new(AtomicUsize::new(0));
        let counter = pressed.clone();
        let describe: Box<dyn Describe> = Box::new(move |item: &Item| {
            let counter = counter.clone();
            let mut desc = ItemDescription::basic(&item.name);
            desc.buttons.push(ItemButton::action(
                "Star",
                Arc::new(move |_item: &Item| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            ));
            desc
        });
        let source = Arc::new(ScriptedSource::new(vec![("", listing(&[], &["x.png"]))]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut browser = BrowserController::new(
            BrowserOptions::new("test"),
            source,
            describe,
            Recorder::default(),
            BrowserPrefs::new("test", Box::new(MemoryPrefs::default())),
            tx,
        );
        browser.navigate("");
        pump(&mut browser, &mut rx).await;

        browser.press_button("x.png", 0).unwrap();
        assert_eq!(pressed.load(Ordering::SeqCst), 1);
        assert!(browser.press_button("x.png", 3).is_err());
    }

    #[test]
    fn layout_detection() {
        assert_eq!(LayoutMode::detect(120, 80, false), LayoutMode::Desktop);
        assert_eq!(LayoutMode::detect(60, 80, false), LayoutMode::Mobile);
        assert_eq!(LayoutMode::detect(200, 80, true), LayoutMode::Mobile);
    }
}
