//! REST client for the remote record collections.
//!
//! Wraps the remote API's verb-shaped endpoints
//! (`GET/POST/PUT/DELETE /api/{collection}`) using [`reqwest`], parses the
//! shared `{success, data, count, totalPages, currentPage, message,
//! errores}` envelope, and maps failures into the core error taxonomy.

pub mod client;
pub mod envelope;

pub use client::{ListPage, ListParams, RecordGateway, RestGateway};
pub use envelope::ApiEnvelope;
