//! Stable comparator for list sorting.
//!
//! One canonical rule for missing values: records without the sort field
//! always sort first, in both directions. The direction flips only the
//! comparison of present values, never the missing-value rule.

use std::cmp::Ordering;

use padron_core::query::SortDirection;
use padron_core::record::{FieldValue, Registro};

/// Compare two records by a sort key and direction.
pub fn compare_records<R: Registro>(
    a: &R,
    b: &R,
    key: &str,
    direction: SortDirection,
) -> Ordering {
    match (a.sort_value(key), b.sort_value(key)) {
        (None, None) => Ordering::Equal,
        // Missing values sort first regardless of direction.
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(av), Some(bv)) => {
            let ordering = compare_values(&av, &bv);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}

/// Stable in-place sort of a collection slice.
pub fn sort_records<R: Registro>(records: &mut [R], key: &str, direction: SortDirection) {
    records.sort_by(|a, b| compare_records(a, b, key, direction));
}

/// Text compares case-insensitively (Unicode lowercase fold); integers
/// and booleans compare naturally (`false < true`). Values of different
/// kinds compare equal — a sort key always yields one kind per record
/// type, so this arm is unreachable in practice.
fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Text(a), FieldValue::Text(b)) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
        (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
