//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DomainEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` between the store, the
//! live-update bridge, and the rendering layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use padron_core::error::FieldError;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// What happened, independent of how it should be displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A record was created, locally or by another session.
    RecordCreated,
    /// A record was updated, locally or by another session.
    RecordUpdated,
    /// A record was soft-deleted.
    RecordDeleted,
    /// A write was rejected with field-level messages.
    ValidationFailed { errors: Vec<FieldError> },
    /// The live-update channel came up.
    ChannelConnected,
    /// The live-update channel dropped. Emitted once per transition.
    ChannelDisconnected,
}

/// A domain event emitted by the data layer.
///
/// Constructed via [`DomainEvent::new`] and enriched with the builder
/// methods [`with_record`](DomainEvent::with_record) and
/// [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub kind: EventKind,

    /// Entity kind the event concerns (e.g. `"empresa"`, `"conductor"`).
    pub entity: String,

    /// Id of the record involved, when there is one.
    pub record_id: Option<String>,

    /// Human-readable label of the record involved, for notifications.
    pub display_name: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create a new event with only the required kind and entity.
    pub fn new(kind: EventKind, entity: impl Into<String>) -> Self {
        Self {
            kind,
            entity: entity.into(),
            record_id: None,
            display_name: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the record the event concerns.
    pub fn with_record(mut self, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DomainEvent`].
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// nothing in the data layer depends on being observed.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(kind = ?event.kind, entity = %event.entity, "Publishing domain event");
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
