//! Filtering, sorting and paging of the listed items.

use std::ops::Range;

use crate::browser::item::Item;

/// Default number of items per page.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;
/// Default number of entries rendered eagerly before deferring the rest.
pub const DEFAULT_MAX_PRE_BUILD: usize = 512;
/// Upper bound on the size of one deferred render chunk.
const MAX_CHUNK: usize = 100;

/// Sort key for the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMethod {
    /// Reverse lexicographic by name.
    #[default]
    Name,
    /// Newest first; undated items last.
    Date,
}

impl SortMethod {
    /// Parse sort_by from config string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "date" => SortMethod::Date,
            _ => SortMethod::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMethod::Name => "Name",
            SortMethod::Date => "Date",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortMethod::Name => SortMethod::Date,
            SortMethod::Date => SortMethod::Name,
        }
    }
}

/// Full item set plus the derived filtered, sorted and paged views.
#[derive(Debug, Clone)]
pub struct PageState {
    all_items: Vec<Item>,
    /// Indices into `all_items`, filtered and sorted.
    filtered: Vec<usize>,
    filter: String,
    sort: SortMethod,
    current_page: usize,
    items_per_page: usize,
    total_pages: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl PageState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            all_items: Vec::new(),
            filtered: Vec::new(),
            filter: String::new(),
            sort: SortMethod::default(),
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_pages: 0,
        }
    }

    /// Replace the full item set. Call `recompute` afterwards.
    pub fn set_items(&mut self, items: Vec<Item>) {
        self.all_items = items;
        self.filtered.clear();
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_lowercase();
    }

    pub fn set_sort(&mut self, sort: SortMethod) {
        self.sort = sort;
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page;
    }

    pub fn set_items_per_page(&mut self, per_page: usize) {
        self.items_per_page = per_page.max(1);
    }

    /// Re-derive the filtered and sorted view and clamp the current page.
    ///
    /// With `reverse` the full item set is reversed in place first.
    pub fn recompute(&mut self, reverse: bool) {
        if reverse {
            self.all_items.reverse();
        }

        let filter = &self.filter;
        self.filtered = self
            .all_items
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.is_empty() || item.name.to_lowercase().contains(filter))
            .map(|(idx, _)| idx)
            .collect();

        let items = &self.all_items;
        match self.sort {
            SortMethod::Name => self
                .filtered
                .sort_by(|&a, &b| items[b].name.cmp(&items[a].name)),
            SortMethod::Date => self
                .filtered
                .sort_by(|&a, &b| items[b].date.cmp(&items[a].date)),
        }

        self.total_pages = self.filtered.len().div_ceil(self.items_per_page);
        if self.current_page > self.total_pages || self.current_page == 0 {
            self.current_page = 1;
        }
    }

    pub fn all_items(&self) -> &[Item] {
        &self.all_items
    }

    /// Filtered and sorted items, in display order.
    pub fn filtered(&self) -> impl Iterator<Item = &Item> + '_ {
        self.filtered.iter().map(move |&idx| &self.all_items[idx])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Index range of the current page within the filtered view.
    pub fn page_range(&self) -> Range<usize> {
        let start = (self.current_page.saturating_sub(1) * self.items_per_page).min(self.filtered.len());
        let end = (start + self.items_per_page).min(self.filtered.len());
        start..end
    }

    /// Items on the current page.
    pub fn page_items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.filtered[self.page_range()]
            .iter()
            .map(move |&idx| &self.all_items[idx])
    }

    pub fn find(&self, name: &str) -> Option<&Item> {
        self.all_items.iter().find(|i| i.name == name)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn sort(&self) -> SortMethod {
        self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Page controls for the current position.
    pub fn buttons(&self) -> Vec<PageButton> {
        page_buttons(self.current_page, self.total_pages)
    }
}

/// One element of the pagination control strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Prev { enabled: bool },
    Page { number: usize, active: bool },
    Ellipsis,
    Next { enabled: bool },
}

/// Build the control strip: first and last page, one page either side of
/// the current one, and ellipses for the gaps.
pub fn page_buttons(current: usize, total: usize) -> Vec<PageButton> {
    let mut buttons = vec![PageButton::Prev {
        enabled: current > 1,
    }];
    if total == 0 {
        buttons.push(PageButton::Next { enabled: false });
        return buttons;
    }

    let page = |number: usize| PageButton::Page {
        number,
        active: number == current,
    };

    buttons.push(page(1));
    if total <= 5 {
        buttons.extend((2..=total).map(page));
    } else {
        let left = current.saturating_sub(1).max(2);
        let right = (current + 1).min(total - 1);
        if left > 2 {
            buttons.push(PageButton::Ellipsis);
        }
        buttons.extend((left..=right).map(page));
        if right < total - 1 {
            buttons.push(PageButton::Ellipsis);
        }
        buttons.push(page(total));
    }

    buttons.push(PageButton::Next {
        enabled: current < total,
    });
    buttons
}

/// Which entries to render now and which to defer into on-demand chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub eager: Range<usize>,
    pub deferred: Vec<Range<usize>>,
}

impl RenderPlan {
    /// Plan for `len` entries after `chunks_loaded` deferred chunks were
    /// requested.
    pub fn new(len: usize, max_pre_build: usize, chunks_loaded: usize) -> Self {
        let chunk = (max_pre_build / 2).clamp(1, MAX_CHUNK);
        let eager_len = (max_pre_build + chunks_loaded * chunk).min(len);
        let mut deferred = Vec::new();
        let mut start = eager_len;
        while start < len {
            let end = (start + chunk).min(len);
            deferred.push(start..end);
            start = end;
        }
        Self {
            eager: 0..eager_len,
            deferred,
        }
    }

    /// Everything eager, as used for paged layouts.
    pub fn all(len: usize) -> Self {
        Self {
            eager: 0..len,
            deferred: Vec::new(),
        }
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.iter().map(|r| r.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn state_with(names: &[&str]) -> PageState {
        let mut state = PageState::default();
        state.set_items(names.iter().map(|n| Item::new(*n)).collect());
        state.recompute(false);
        state
    }

    fn filtered_names(state: &PageState) -> Vec<&str> {
        state.filtered().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn filter_is_case_insensitive() {
        let mut state = state_with(&["Beta", "alpha"]);
        state.set_filter("a");
        state.recompute(false);
        assert_eq!(state.filtered_len(), 2);

        state.set_filter("A");
        state.recompute(false);
        assert_eq!(state.filtered_len(), 2);

        state.set_filter("z");
        state.recompute(false);
        assert_eq!(state.filtered_len(), 0);
    }

    #[test]
    fn empty_filter_passes_everything() {
        let state = state_with(&["x", "y", "z"]);
        assert_eq!(state.filtered_len(), 3);
    }

    #[test]
    fn name_sort_is_descending() {
        let state = state_with(&["a", "b", "c"]);
        assert_eq!(filtered_names(&state), vec!["c", "b", "a"]);
    }

    #[test]
    fn date_sort_is_newest_first_with_undated_last() {
        let base = SystemTime::UNIX_EPOCH;
        let mut state = PageState::default();
        state.set_items(vec![
            Item::new("old").with_date(base + Duration::from_secs(10)),
            Item::new("undated"),
            Item::new("new").with_date(base + Duration::from_secs(100)),
        ]);
        state.set_sort(SortMethod::Date);
        state.recompute(false);
        assert_eq!(filtered_names(&state), vec!["new", "old", "undated"]);
    }

    #[test]
    fn date_ties_keep_filter_order() {
        let date = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        let mut state = PageState::default();
        state.set_items(vec![
            Item::new("first").with_date(date),
            Item::new("second").with_date(date),
            Item::new("third").with_date(date),
        ]);
        state.set_sort(SortMethod::Date);
        state.recompute(false);
        assert_eq!(filtered_names(&state), vec!["first", "second", "third"]);

        state.recompute(true);
        assert_eq!(filtered_names(&state), vec!["third", "second", "first"]);
    }

    #[test]
    fn pages_for_twenty_five_items() {
        let names: Vec<String> = (0..25).map(|i| format!("item{:02}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut state = state_with(&refs);
        assert_eq!(state.total_pages(), 3);

        state.set_page(3);
        state.recompute(false);
        assert_eq!(state.page_items().count(), 5);

        state.set_page(4);
        state.recompute(false);
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.page_items().count(), 10);
    }

    #[test]
    fn empty_set_has_zero_pages_and_page_one() {
        let mut state = state_with(&[]);
        state.set_page(2);
        state.recompute(false);
        assert_eq!(state.total_pages(), 0);
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.page_items().count(), 0);
    }

    #[test]
    fn filter_change_clamps_page() {
        let names: Vec<String> = (0..30).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut state = state_with(&refs);
        state.set_page(3);
        state.recompute(false);
        assert_eq!(state.current_page(), 3);

        state.set_filter("n1");
        state.recompute(false);
        // n1, n10..n19 = 11 items, 2 pages
        assert_eq!(state.total_pages(), 2);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn reverse_applies_before_filtering() {
        let mut state = state_with(&["a", "b"]);
        state.recompute(true);
        let names: Vec<&str> = state.all_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn buttons_for_small_page_counts() {
        let buttons = page_buttons(2, 3);
        assert_eq!(
            buttons,
            vec![
                PageButton::Prev { enabled: true },
                PageButton::Page { number: 1, active: false },
                PageButton::Page { number: 2, active: true },
                PageButton::Page { number: 3, active: false },
                PageButton::Next { enabled: true },
            ]
        );
    }

    #[test]
    fn buttons_window_around_current_page() {
        let buttons = page_buttons(6, 12);
        assert_eq!(
            buttons,
            vec![
                PageButton::Prev { enabled: true },
                PageButton::Page { number: 1, active: false },
                PageButton::Ellipsis,
                PageButton::Page { number: 5, active: false },
                PageButton::Page { number: 6, active: true },
                PageButton::Page { number: 7, active: false },
                PageButton::Ellipsis,
                PageButton::Page { number: 12, active: false },
                PageButton::Next { enabled: true },
            ]
        );
    }

    #[test]
    fn buttons_at_edges_skip_ellipsis() {
        let first = page_buttons(1, 8);
        assert_eq!(first[1], PageButton::Page { number: 1, active: true });
        assert_eq!(first[2], PageButton::Page { number: 2, active: false });
        assert_eq!(first[0], PageButton::Prev { enabled: false });

        let last = page_buttons(8, 8);
        assert_eq!(last[last.len() - 1], PageButton::Next { enabled: false });
        assert_eq!(last[last.len() - 2], PageButton::Page { number: 8, active: true });
        assert_eq!(last[last.len() - 3], PageButton::Page { number: 7, active: false });
    }

    #[test]
    fn render_plan_defers_beyond_pre_build() {
        let plan = RenderPlan::new(1000, 512, 0);
        assert_eq!(plan.eager, 0..512);
        assert_eq!(plan.deferred.len(), 5);
        assert_eq!(plan.deferred[0], 512..612);
        assert_eq!(plan.deferred[4], 912..1000);
        assert_eq!(plan.deferred_len(), 488);

        let plan = RenderPlan::new(1000, 512, 2);
        assert_eq!(plan.eager, 0..712);
    }

    #[test]
    fn render_plan_small_list_is_all_eager() {
        let plan = RenderPlan::new(20, 512, 0);
        assert_eq!(plan, RenderPlan::all(20));
    }
}
