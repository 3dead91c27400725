//! Collection state store: the one mutation surface the rendering layer
//! talks to.
//!
//! A [`store::CollectionStore`] keeps the current page of results, the
//! active query parameters, and derived pagination metadata mutually
//! consistent under interleaved user actions and asynchronous push
//! events. List resolution is delegated to a [`strategy::FetchStrategy`]
//! (server-paginated or client-side pipeline) chosen at construction.

pub mod state;
pub mod store;
pub mod strategy;

pub use state::{EditingDraft, EventLogEntry, StoreSnapshot};
pub use store::CollectionStore;
pub use strategy::{ClientPipeline, FetchStrategy, ServerPaginated};
