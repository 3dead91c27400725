//! Filter-dimension predicates.

use padron_core::query::Query;
use padron_core::record::Registro;

/// Whether a record satisfies every active filter dimension of a query.
///
/// For each dimension with a non-empty accepted-value set, the record's
/// value must match at least one accepted value (membership); booleans
/// compare by equality. Dimensions with empty sets impose no constraint.
/// Active dimensions are ANDed together. A record that does not carry an
/// active dimension at all fails that constraint.
pub fn matches_filters<R: Registro>(record: &R, query: &Query) -> bool {
    query.active_filters().all(|(dimension, accepted)| {
        match record.filter_value(dimension) {
            Some(value) => accepted.iter().any(|want| value.accepts(want)),
            None => false,
        }
    })
}
