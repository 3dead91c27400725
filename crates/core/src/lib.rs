//! Domain types shared by every crate in the workspace.
//!
//! Defines the generic [`record::Registro`] abstraction, the concrete
//! `Empresa` and `Conductor` records, query/result types, the error
//! taxonomy surfaced to the rendering layer, and client configuration.

pub mod conductor;
pub mod config;
pub mod empresa;
pub mod error;
pub mod query;
pub mod record;
pub mod types;
