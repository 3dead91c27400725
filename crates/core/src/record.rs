//! Generic record abstraction over the collections the console manages.
//!
//! The list pipeline, the gateway, and the state store are all generic
//! over [`Registro`] so that "empresas" and "conductores" (and any future
//! collection) share one implementation instead of near-duplicate modules
//! per screen.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::Timestamp;

/// A scalar value extracted from a record for sorting or filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

/// A value accepted by a filter dimension.
///
/// Ordered so accepted-value sets can live in a `BTreeSet`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Whether this field value satisfies one accepted filter value.
    ///
    /// Booleans compare by equality; text compares by equality as well
    /// (filter dimensions are enumerations, not substrings). An `Int`
    /// never matches — no filter dimension is numeric.
    pub fn accepts(&self, accepted: &FilterValue) -> bool {
        match (self, accepted) {
            (FieldValue::Bool(have), FilterValue::Bool(want)) => have == want,
            (FieldValue::Text(have), FilterValue::Text(want)) => have == want,
            _ => false,
        }
    }
}

/// A managed record: one row of a remote collection.
///
/// Implementations expose just enough structure for the pipeline and the
/// store to search, filter, sort and merge records without knowing the
/// concrete type.
pub trait Registro: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Path segment of the collection on the remote API, e.g. `"empresas"`.
    const COLLECTION: &'static str;

    /// Entity name used in live event names (`"empresa"` in
    /// `empresa:creado`) and in domain events.
    const ENTITY: &'static str;

    /// Sort key applied to fresh queries.
    const DEFAULT_SORT_KEY: &'static str;

    /// Opaque identifier, assigned by the remote system on create.
    fn id(&self) -> &str;

    /// Human-readable label for notifications.
    fn display_name(&self) -> String;

    /// Values scanned by the case-insensitive search predicate.
    fn search_haystacks(&self) -> Vec<&str>;

    /// Value of a sortable field, or `None` when the field is absent on
    /// this record (absent values have their own ordering rule).
    fn sort_value(&self, key: &str) -> Option<FieldValue>;

    /// Value of a filter dimension, or `None` when the record does not
    /// carry that dimension.
    fn filter_value(&self, dimension: &str) -> Option<FieldValue>;

    /// Soft-delete marker; `Some` means the record is logically deleted.
    fn deleted_at(&self) -> Option<Timestamp>;
}
