//! Structured domain events and the in-process bus that fans them out.
//!
//! State transitions in the store stay pure; anything user-visible
//! (toasts, banners, badges) is driven by a presentation-layer listener
//! subscribed to this bus.

pub mod bus;

pub use bus::{DomainEvent, EventBus, EventKind};
