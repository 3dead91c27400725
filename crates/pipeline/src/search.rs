//! Case-insensitive substring search over a record's searchable fields.

use padron_core::record::Registro;

/// Whether a record matches a committed search term.
///
/// A record matches when ANY searchable field contains the term,
/// compared case-insensitively. An empty or whitespace-only term
/// matches everything.
pub fn matches_search<R: Registro>(record: &R, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record
        .search_haystacks()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}
