//! Client-side list engine: filter, sort and paginate an already loaded collection.
//!
//! The collection is shared immutably. Every interaction mutates the [`ViewState`] and
//! re-derives the visible ordering synchronously, so readers always see a view that is
//! consistent with the current state.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use icu_collator::options::{AlternateHandling, CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use regex::{Regex, RegexBuilder};
use tracing::{debug, trace, warn};

use crate::field::{Field, Filter};
use crate::pagination::{self, PageSlot};

pub const DEFAULT_RESULTS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub sort_field: usize,
    pub sort_order: SortOrder,
    pub current_page: usize,
    pub results_per_page: usize,
    pub filter_values: HashMap<String, String>,
    pub filters_visible: bool,
}

impl ViewState {
    fn new(results_per_page: usize) -> Self {
        ViewState {
            sort_field: 0,
            sort_order: SortOrder::Ascending,
            current_page: 1,
            results_per_page: results_per_page.max(1),
            filter_values: HashMap::new(),
            filters_visible: false,
        }
    }
}

/// Turns a record into whatever the caller displays for a row.
pub trait RowRenderer<T> {
    type Output;

    fn render_row(&self, record: &T, index: usize) -> Self::Output;
}

impl<T, O, F> RowRenderer<T> for F
where
    F: Fn(&T, usize) -> O,
{
    type Output = O;

    fn render_row(&self, record: &T, index: usize) -> O {
        self(record, index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterControl {
    pub key: String,
    pub label: String,
    pub value: String,
    /// Selectable values for dropdowns, `None` for free text search.
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub key: String,
    pub label: String,
    pub min_width: Option<u16>,
    pub sorted: Option<SortOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationView {
    pub current_page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub slots: Vec<PageSlot>,
}

/// Everything needed to draw the list, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<O> {
    pub filters_visible: bool,
    /// Present only while the filter panel is open.
    pub filter_controls: Option<Vec<FilterControl>>,
    pub results_per_page: usize,
    pub headers: Vec<Header>,
    /// Exactly `results_per_page` entries, `None` marks a filler row.
    pub rows: Vec<Option<O>>,
    pub filtered_count: usize,
    pub pagination: PaginationView,
}

pub struct FilterableList<T> {
    data: Arc<Vec<Option<T>>>,
    fields: Vec<Field<T>>,
    filters: Vec<Filter<T>>,
    dropdown_options: HashMap<String, Vec<String>>,
    state: ViewState,
    rows: Arc<Vec<usize>>, // Data indices of the filtered records in sort order
}

impl<T> FilterableList<T> {
    pub fn new(data: impl Into<Arc<Vec<Option<T>>>>, fields: Vec<Field<T>>, filters: Vec<Filter<T>>) -> Self {
        let data = data.into();
        let dropdown_options = filters
            .iter()
            .filter_map(|filter| match filter {
                Filter::Dropdown { field } => {
                    Some((field.key().to_string(), distinct_values(&data, field)))
                }
                Filter::Search { .. } => None,
            })
            .collect();

        let mut list = FilterableList {
            data,
            fields,
            filters,
            dropdown_options,
            state: ViewState::new(DEFAULT_RESULTS_PER_PAGE),
            rows: Arc::new(Vec::new()),
        };
        list.refresh();
        list
    }

    pub fn with_results_per_page(mut self, results_per_page: usize) -> Self {
        self.set_results_per_page(results_per_page);
        self
    }

    // -------------------- Accessors ---------------------- //

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    pub fn filters(&self) -> &[Filter<T>] {
        &self.filters
    }

    pub fn data(&self) -> &Arc<Vec<Option<T>>> {
        &self.data
    }

    pub fn sort_field(&self) -> Option<&Field<T>> {
        self.fields.get(self.state.sort_field)
    }

    pub fn filter_value(&self, key: &str) -> &str {
        self.state
            .filter_values
            .get(key)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn dropdown_options(&self, key: &str) -> &[String] {
        self.dropdown_options
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn filtered_len(&self) -> usize {
        self.rows.len()
    }

    /// Data indices of all filtered records in display order.
    pub fn ordered_indices(&self) -> Arc<Vec<usize>> {
        Arc::clone(&self.rows)
    }

    pub fn total_pages(&self) -> usize {
        pagination::total_pages(self.rows.len(), self.state.results_per_page)
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    pub fn results_per_page(&self) -> usize {
        self.state.results_per_page
    }

    /// Position of the first record of the current page in the filtered ordering.
    pub fn page_offset(&self) -> usize {
        pagination::page_bounds(self.state.current_page, self.state.results_per_page, self.rows.len()).0
    }

    /// Records on the current page, without filler rows.
    pub fn page_records(&self) -> Vec<&T> {
        let (begin, end) =
            pagination::page_bounds(self.state.current_page, self.state.results_per_page, self.rows.len());
        self.rows[begin..end]
            .iter()
            .filter_map(|&idx| self.data[idx].as_ref())
            .collect()
    }

    /// Record at `row` of the current page.
    pub fn page_record(&self, row: usize) -> Option<&T> {
        let idx = self.page_offset() + row;
        if row >= self.state.results_per_page {
            return None;
        }
        self.rows.get(idx).and_then(|&d| self.data[d].as_ref())
    }

    pub fn page_slots(&self) -> Vec<PageSlot> {
        pagination::page_slots(self.state.current_page, self.total_pages())
    }

    // -------------------- Interactions ---------------------- //

    pub fn toggle_filters(&mut self) {
        self.state.filters_visible = !self.state.filters_visible;
    }

    pub fn set_filter(&mut self, key: &str, value: impl Into<String>) {
        if !self.filters.iter().any(|f| f.key() == key) {
            debug!("Ignoring value for unknown filter {key}");
            return;
        }
        self.state.filter_values.insert(key.to_string(), value.into());
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        self.state.filter_values.clear();
        self.refresh();
    }

    /// Header click. The active field flips its order, any other field becomes active
    /// in ascending order.
    pub fn sort_by(&mut self, field_idx: usize) {
        if field_idx >= self.fields.len() {
            return;
        }
        if field_idx == self.state.sort_field {
            self.state.sort_order = self.state.sort_order.flip();
        } else {
            self.state.sort_field = field_idx;
            self.state.sort_order = SortOrder::Ascending;
        }
        self.refresh();
    }

    pub fn sort_by_key(&mut self, key: &str) {
        if let Some(idx) = self.fields.iter().position(|f| f.key() == key) {
            self.sort_by(idx);
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.current_page = pagination::clamp_page(page, self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.state.current_page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.state.current_page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page(1);
    }

    pub fn last_page(&mut self) {
        self.set_page(self.total_pages());
    }

    pub fn set_results_per_page(&mut self, results_per_page: usize) {
        if results_per_page == 0 {
            return;
        }
        self.state.results_per_page = results_per_page;
        self.set_page(self.state.current_page);
    }

    /// Applies text from the page size input. Anything but a positive number is ignored.
    pub fn apply_results_per_page_input(&mut self, input: &str) -> bool {
        match input.trim().parse::<usize>() {
            Ok(n) if n > 0 => {
                self.set_results_per_page(n);
                true
            }
            _ => {
                trace!("Ignoring page size input {input:?}");
                false
            }
        }
    }

    /// Applies text from the direct page number input. Non numeric text is ignored.
    pub fn apply_page_input(&mut self, input: &str) -> bool {
        match input.trim().parse::<usize>() {
            Ok(n) => {
                self.set_page(n);
                true
            }
            Err(_) => {
                trace!("Ignoring page input {input:?}");
                false
            }
        }
    }

    // -------------------- Derivation ---------------------- //

    /// Re-runs filter and sort on the full collection and clamps the current page.
    fn refresh(&mut self) {
        let searches: Vec<(Option<Regex>, Vec<&Field<T>>)> = self
            .filters
            .iter()
            .filter_map(|filter| match filter {
                Filter::Search { key, scope, .. } => {
                    let term = self.state.filter_values.get(key)?.trim();
                    if term.is_empty() {
                        return None;
                    }
                    let fields = self
                        .fields
                        .iter()
                        .filter(|f| scope.is_empty() || scope.iter().any(|s| s == f.key()))
                        .collect();
                    Some((search_pattern(term), fields))
                }
                Filter::Dropdown { .. } => None,
            })
            .collect();

        let selections: Vec<(&Field<T>, String)> = self
            .filters
            .iter()
            .filter_map(|filter| match filter {
                Filter::Dropdown { field } => {
                    let selected = self.state.filter_values.get(field.key())?;
                    if selected.is_empty() {
                        None
                    } else {
                        Some((field, selected.to_lowercase()))
                    }
                }
                Filter::Search { .. } => None,
            })
            .collect();

        let mut keyed: Vec<(usize, Option<String>)> = self
            .data
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| record.as_ref().map(|r| (idx, r)))
            .filter(|(_, record)| {
                searches.iter().all(|(pattern, fields)| {
                    fields
                        .iter()
                        .any(|f| {
                            f.value(record)
                                .is_some_and(|v| pattern.as_ref().is_some_and(|p| p.is_match(&v)))
                        })
                })
            })
            .filter(|(_, record)| {
                selections.iter().all(|(field, selected)| {
                    field
                        .value(record)
                        .is_some_and(|v| v.to_lowercase() == *selected)
                })
            })
            .map(|(idx, record)| {
                let key = self
                    .fields
                    .get(self.state.sort_field)
                    .and_then(|f| f.value(record))
                    .map(|v| v.to_lowercase());
                (idx, key)
            })
            .collect();

        let order = self.state.sort_order;
        let collator = sort_collator();
        keyed.sort_by(|(_, a), (_, b)| {
            compare_sort_keys(collator.as_ref(), a.as_deref(), b.as_deref(), order)
        });

        self.rows = Arc::new(keyed.into_iter().map(|(idx, _)| idx).collect());
        self.state.current_page = pagination::clamp_page(self.state.current_page, self.total_pages());

        trace!(
            "Derived {} of {} records, page {}/{}",
            self.rows.len(),
            self.data.len(),
            self.state.current_page,
            self.total_pages()
        );
    }

    pub fn render<R: RowRenderer<T>>(&self, renderer: &R) -> ListView<R::Output> {
        let filter_controls = self.state.filters_visible.then(|| {
            self.filters
                .iter()
                .map(|filter| FilterControl {
                    key: filter.key().to_string(),
                    label: filter.label(),
                    value: self.filter_value(filter.key()).to_string(),
                    options: filter
                        .is_dropdown()
                        .then(|| self.dropdown_options(filter.key()).to_vec()),
                })
                .collect()
        });

        let headers = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| Header {
                key: field.key().to_string(),
                label: field.label(),
                min_width: field.min_width(),
                sorted: (idx == self.state.sort_field).then_some(self.state.sort_order),
            })
            .collect();

        let offset = self.page_offset();
        let mut rows: Vec<Option<R::Output>> = self
            .page_records()
            .into_iter()
            .enumerate()
            .map(|(i, record)| Some(renderer.render_row(record, offset + i)))
            .collect();
        rows.resize_with(self.state.results_per_page, || None);

        let total_pages = self.total_pages();
        ListView {
            filters_visible: self.state.filters_visible,
            filter_controls,
            results_per_page: self.state.results_per_page,
            headers,
            rows,
            filtered_count: self.rows.len(),
            pagination: PaginationView {
                current_page: self.state.current_page,
                total_pages,
                has_previous: self.state.current_page > 1,
                has_next: self.state.current_page < total_pages,
                slots: pagination::page_slots(self.state.current_page, total_pages),
            },
        }
    }
}

/// Case insensitive pattern for a search term. Terms that are not valid regular
/// expressions are matched literally.
fn search_pattern(term: &str) -> Option<Regex> {
    RegexBuilder::new(term)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build()
        })
        .map_err(|e| debug!("Search term {term:?} is unusable: {e}"))
        .ok()
}

/// Root locale collation. Punctuation only breaks ties, so `bot_b` sits next to `botb`.
fn sort_collator() -> Option<CollatorBorrowed<'static>> {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Tertiary);
    options.alternate_handling = Some(AlternateHandling::Shifted);
    Collator::try_new(Default::default(), options)
        .map_err(|e| warn!("Collation data unavailable, sorting by code point: {e}"))
        .ok()
}

/// Absent values always go last, the order only applies between defined values.
fn compare_sort_keys(
    collator: Option<&CollatorBorrowed<'static>>,
    a: Option<&str>,
    b: Option<&str>,
    order: SortOrder,
) -> Ordering {
    let compare = |x: &str, y: &str| match collator {
        Some(collator) => collator.compare(x, y),
        None => x.cmp(y),
    };
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => compare(a, b),
            SortOrder::Descending => compare(b, a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn distinct_values<T>(data: &[Option<T>], field: &Field<T>) -> Vec<String> {
    let mut seen = HashSet::new();
    data.iter()
        .flatten()
        .filter_map(|record| field.value(record))
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
