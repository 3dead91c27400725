//! Query parameters and result pages.
//!
//! A [`Query`] captures everything a list screen can ask for: page,
//! search term, filter dimensions, and sort. A [`ResultPage`] is the
//! store's answer, with pagination metadata kept consistent with the
//! query that produced it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::record::FilterValue;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire value for the remote API's `order` parameter.
    pub fn as_order_param(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Active list parameters for one collection screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 1-based page number; always within `[1, total_pages]` after any
    /// operation that can change `total_pages`.
    pub page: u32,
    pub page_size: u32,
    /// Committed search term; `None` matches everything.
    pub search_term: Option<String>,
    /// Accepted values per filter dimension. An absent dimension or an
    /// empty set imposes no constraint.
    pub filters: BTreeMap<String, BTreeSet<FilterValue>>,
    pub sort_key: String,
    pub sort_direction: SortDirection,
}

impl Query {
    /// Fresh query sorted ascending by the given key, page 1, no
    /// search term or filters.
    pub fn new(sort_key: impl Into<String>) -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search_term: None,
            filters: BTreeMap::new(),
            sort_key: sort_key.into(),
            sort_direction: SortDirection::Ascending,
        }
    }

    /// Clear search term and filters and return to page 1, preserving
    /// the sort key and direction. Idempotent.
    pub fn reset(&mut self) {
        self.page = 1;
        self.search_term = None;
        self.filters.clear();
    }

    /// Filter dimensions that actually constrain results (non-empty
    /// accepted-value sets).
    pub fn active_filters(&self) -> impl Iterator<Item = (&String, &BTreeSet<FilterValue>)> {
        self.filters.iter().filter(|(_, accepted)| !accepted.is_empty())
    }
}

/// One page of resolved results plus pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage<R> {
    /// Records on the current page, at most `page_size` of them.
    pub items: Vec<R>,
    /// Count of all records matching the query, not just this page.
    pub total_count: u64,
    /// `ceil(total_count / page_size)`, floored at 1.
    pub total_pages: u32,
    /// Page the items were sliced from.
    pub current_page: u32,
}

impl<R> ResultPage<R> {
    /// Empty single-page result, the state before the first resolve.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            total_pages: 1,
            current_page: 1,
        }
    }
}

/// Total page count for a collection size, floored at 1 so that an
/// empty collection still has a valid page 1.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    ((total_count + size - 1) / size).max(1) as u32
}

/// Clamp a requested page into `[1, total_pages]`.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}
