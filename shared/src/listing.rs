//! Client-side shaping of an already fetched working set: filter, then sort,
//! then slice into a page.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec<K> {
    pub key: K,
    pub direction: SortDirection,
}

/// Inclusive on both ends; an open end matches everything on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// A record the listing layer knows how to search, filter and order.
pub trait Listable {
    type Filter: Clone + PartialEq + Default;
    type SortKey: Copy + PartialEq;

    /// `needle` is already trimmed and lowercased and never empty.
    fn matches_search(&self, needle: &str) -> bool;

    fn matches_filter(&self, filter: &Self::Filter) -> bool;

    /// The date a date-range filter is evaluated against.
    fn listed_on(&self) -> Option<NaiveDate> {
        None
    }

    fn compare(&self, other: &Self, key: Self::SortKey) -> Ordering;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery<F, K> {
    search: String,
    filter: F,
    date_range: DateRange,
    sort: SortSpec<K>,
    page: usize,
    page_size: usize,
}

impl<F: Clone + PartialEq + Default, K: Copy + PartialEq> ListQuery<F, K> {
    #[must_use]
    pub fn new(sort: SortSpec<K>) -> Self {
        Self {
            search: String::new(),
            filter: F::default(),
            date_range: DateRange::default(),
            sort,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn filter(&self) -> &F {
        &self.filter
    }

    #[must_use]
    pub const fn date_range(&self) -> DateRange {
        self.date_range
    }

    #[must_use]
    pub const fn sort(&self) -> SortSpec<K> {
        self.sort
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    // Every criteria change lands back on page 1 so the user never sits on a
    // page the new result set doesn't have.

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    pub fn set_filter(&mut self, filter: F) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
        self.page = 1;
    }

    pub fn set_sort(&mut self, key: K, direction: SortDirection) {
        self.sort = SortSpec { key, direction };
        self.page = 1;
    }

    /// Selecting the active key flips direction; a new key starts ascending.
    pub fn sort_by(&mut self, key: K) {
        let direction = if self.sort.key == key {
            self.sort.direction.toggled()
        } else {
            SortDirection::Ascending
        };
        self.set_sort(key, direction);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn reset(&mut self) {
        self.search.clear();
        self.filter = F::default();
        self.date_range = DateRange::default();
        self.page = 1;
    }

    /// Pulls the page back inside `[1, total_pages]` once the working set has
    /// shrunk under it.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page = self.page.clamp(1, total_pages.max(1));
    }

    /// Moves to `page` if it lies within `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> bool {
        self.clamp_page(total_pages);
        if page >= 1 && page <= total_pages && page != self.page {
            self.page = page;
            true
        } else {
            false
        }
    }

    pub fn next_page(&mut self, total_pages: usize) -> bool {
        self.clamp_page(total_pages);
        self.go_to_page(self.page + 1, total_pages)
    }

    pub fn prev_page(&mut self, total_pages: usize) -> bool {
        self.clamp_page(total_pages);
        match self.page.checked_sub(1) {
            Some(page) => self.go_to_page(page, total_pages),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
            total_count: self.total_count,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}

#[must_use]
pub const fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Filters conjunctively, sorts stably, then returns the query's page.
///
/// A page past the end (the working set shrank after a re-fetch) renders the
/// last page instead of an empty one.
pub fn apply<'a, R: Listable>(
    records: &'a [R],
    query: &ListQuery<R::Filter, R::SortKey>,
) -> Paged<&'a R> {
    let needle = query.search.trim().to_lowercase();

    let mut matched: Vec<&R> = records
        .iter()
        .filter(|r| needle.is_empty() || r.matches_search(&needle))
        .filter(|r| r.matches_filter(&query.filter))
        .filter(|r| {
            query.date_range.is_open() || r.listed_on().is_some_and(|d| query.date_range.contains(d))
        })
        .collect();

    let sort = query.sort;
    matched.sort_by(|a, b| sort.direction.apply(a.compare(b, sort.key)));

    let total_count = matched.len();
    let total_pages = total_pages(total_count, query.page_size);
    let page = query.page.clamp(1, total_pages.max(1));
    let start = (page - 1) * query.page_size;

    let items = matched
        .into_iter()
        .skip(start)
        .take(query.page_size)
        .collect();

    Paged {
        items,
        page,
        total_pages,
        total_count,
        has_prev: page > 1,
        has_next: page < total_pages,
    }
}

/// "Page X of Y". An empty result still reads as one page.
#[must_use]
pub fn page_label(page: usize, total_pages: usize) -> String {
    format!("Page {} of {}", page.max(1), total_pages.max(1))
}

/// Case-insensitive substring match against any of `fields`.
#[must_use]
pub fn any_field_contains(needle: &str, fields: &[&str]) -> bool {
    fields.iter().any(|f| f.to_lowercase().contains(needle))
}

/// Float ordering for sort keys; NaN sorts as equal.
#[must_use]
pub fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        tag: &'static str,
        score: u32,
        day: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Key {
        Name,
        Score,
    }

    impl Listable for Item {
        type Filter = Option<&'static str>;
        type SortKey = Key;

        fn matches_search(&self, needle: &str) -> bool {
            any_field_contains(needle, &[self.name])
        }

        fn matches_filter(&self, filter: &Self::Filter) -> bool {
            filter.map_or(true, |tag| self.tag == tag)
        }

        fn listed_on(&self) -> Option<NaiveDate> {
            NaiveDate::from_ymd_opt(2024, 1, self.day)
        }

        fn compare(&self, other: &Self, key: Key) -> Ordering {
            match key {
                Key::Name => self.name.cmp(other.name),
                Key::Score => self.score.cmp(&other.score),
            }
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "Squat", tag: "legs", score: 3, day: 5 },
            Item { name: "Bench", tag: "chest", score: 9, day: 1 },
            Item { name: "Lunge", tag: "legs", score: 3, day: 20 },
            Item { name: "Deadlift", tag: "back", score: 7, day: 12 },
            Item { name: "Leg press", tag: "legs", score: 5, day: 15 },
        ]
    }

    fn query() -> ListQuery<Option<&'static str>, Key> {
        ListQuery::new(SortSpec { key: Key::Name, direction: SortDirection::Ascending })
    }

    #[test]
    fn filters_are_conjunctive() {
        let data = items();
        let mut q = query();
        q.set_filter(Some("legs"));
        q.set_search("l");
        q.set_date_range(DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 10),
            to: None,
        });
        let page = apply(&data, &q);
        let names: Vec<_> = page.items.iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Leg press", "Lunge"]);
    }

    #[test]
    fn navigation_recovers_after_the_set_shrinks() {
        let mut q = query();
        q.set_page_size(2);
        assert!(q.go_to_page(5, 5));

        // Five pages became two; the view already shows page 2.
        assert!(q.prev_page(2));
        assert_eq!(q.page(), 1);

        assert!(q.go_to_page(2, 2));
        q.clamp_page(1);
        assert_eq!(q.page(), 1);
        assert!(!q.next_page(1));
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let data = items();
        let mut q = query();
        q.set_sort(Key::Score, SortDirection::Ascending);
        let page = apply(&data, &q);
        let names: Vec<_> = page.items.iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Squat", "Lunge", "Leg press", "Deadlift", "Bench"]);
    }

    #[test]
    fn descending_reverses_order() {
        let data = items();
        let mut q = query();
        q.set_sort(Key::Name, SortDirection::Descending);
        let page = apply(&data, &q);
        assert_eq!(page.items[0].name, "Squat");
    }

    #[test]
    fn pagination_counts_filtered_records() {
        let data = items();
        let mut q = query();
        q.set_page_size(2);
        let page = apply(&data, &q);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_count, 5);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn navigation_is_bounded() {
        let mut q = query();
        q.set_page_size(2);
        assert!(!q.prev_page(3));
        assert!(q.next_page(3));
        assert!(q.next_page(3));
        assert!(!q.next_page(3));
        assert_eq!(q.page(), 3);
    }

    #[test]
    fn criteria_changes_reset_page() {
        let mut q = query();
        q.set_page_size(1);
        q.go_to_page(4, 5);
        q.set_search("a");
        assert_eq!(q.page(), 1);
        q.go_to_page(3, 5);
        q.set_filter(Some("legs"));
        assert_eq!(q.page(), 1);
        q.go_to_page(2, 5);
        q.sort_by(Key::Score);
        assert_eq!(q.page(), 1);
        q.go_to_page(2, 5);
        q.set_date_range(DateRange::default());
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn sort_by_same_key_toggles_direction() {
        let mut q = query();
        q.sort_by(Key::Name);
        assert_eq!(q.sort().direction, SortDirection::Descending);
        q.sort_by(Key::Score);
        assert_eq!(q.sort().direction, SortDirection::Ascending);
    }

    #[test]
    fn empty_set_has_zero_pages() {
        let data: Vec<Item> = Vec::new();
        let page = apply(&data, &query());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(!page.has_next);
    }

    #[test]
    fn out_of_range_page_shows_last_page() {
        let data = items();
        let mut q = query();
        q.set_page_size(2);
        q.go_to_page(3, 3);
        let shrunk = &data[..2];
        let page = apply(shrunk, &q);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn page_label_never_reads_zero() {
        assert_eq!(page_label(1, 3), "Page 1 of 3");
        assert_eq!(page_label(1, 0), "Page 1 of 1");
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(0, 10), 0);
    }
}
