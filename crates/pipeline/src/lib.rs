//! Pure list transformation pipeline: search → filter → sort → slice.
//!
//! Used by the client-side strategy that fetches a whole collection once
//! and pages through it locally. Every function here is pure so the
//! store can recompute the full pipeline on any parameter change —
//! changing an upstream step changes `total_count`/`total_pages`, which
//! can invalidate the requested page.

pub mod filter;
pub mod paginate;
pub mod search;
pub mod sort;

use padron_core::query::{Query, ResultPage};
use padron_core::record::Registro;

/// Run the full pipeline for one query over an in-memory collection.
///
/// Soft-deleted records are never listed. The requested page is clamped
/// to the page count of the *filtered* collection, so the returned
/// `current_page` is always valid.
pub fn apply<R: Registro>(records: &[R], query: &Query) -> ResultPage<R> {
    let term = query.search_term.as_deref().unwrap_or("");

    let mut matching: Vec<R> = records
        .iter()
        .filter(|r| r.deleted_at().is_none())
        .filter(|r| search::matches_search(*r, term))
        .filter(|r| filter::matches_filters(*r, query))
        .cloned()
        .collect();

    sort::sort_records(&mut matching, &query.sort_key, query.sort_direction);

    paginate::paginate(matching, query.page, query.page_size)
}
