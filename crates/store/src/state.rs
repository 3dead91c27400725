//! Store-owned state and the snapshot handed to readers.

use std::collections::{HashSet, VecDeque};

use padron_core::error::DataError;
use padron_core::query::{Query, ResultPage};
use padron_core::record::Registro;
use padron_core::types::{RecordId, Timestamp};

/// Most recent live events kept for the console's event log.
pub(crate) const EVENT_LOG_CAPACITY: usize = 100;

/// What the editing surface is working on. Exists only while the form
/// is open; discarded (never persisted) on cancel.
#[derive(Debug, Clone, PartialEq)]
pub enum EditingDraft<R> {
    /// Creating a new record.
    Create,
    /// Editing an existing record, loaded for reference.
    Edit(R),
}

/// One live event as received, kept for display/debugging.
#[derive(Debug, Clone)]
pub struct EventLogEntry {
    /// Wire event name, e.g. `empresa:creado`.
    pub event_name: String,
    pub data: serde_json::Value,
    pub received_at: Timestamp,
}

/// Interior state, owned exclusively by the store. Readers get a
/// [`StoreSnapshot`]; the live bridge and the rendering layer never
/// write fields directly.
pub(crate) struct StoreState<R: Registro> {
    pub query: Query,
    pub last_result: ResultPage<R>,
    pub is_loading: bool,
    /// First-load window: the blocking screen gives way once this clears,
    /// result or not.
    pub initializing: bool,
    pub last_error: Option<DataError>,
    /// Selected ids; persists across query and page changes.
    pub selection: HashSet<RecordId>,
    /// Search term typed but not yet committed.
    pub staged_search: Option<String>,
    /// Record loaded for the detail view.
    pub current: Option<R>,
    pub draft: Option<EditingDraft<R>>,
    pub event_log: VecDeque<EventLogEntry>,
}

impl<R: Registro> StoreState<R> {
    pub(crate) fn new(page_size: u32) -> Self {
        let mut query = Query::new(R::DEFAULT_SORT_KEY);
        query.page_size = page_size;
        Self {
            query,
            last_result: ResultPage::empty(),
            is_loading: false,
            initializing: false,
            last_error: None,
            selection: HashSet::new(),
            staged_search: None,
            current: None,
            draft: None,
            event_log: VecDeque::new(),
        }
    }

    pub(crate) fn push_event_log(&mut self, entry: EventLogEntry) {
        if self.event_log.len() == EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(entry);
    }
}

/// Read-only view of the store for the rendering layer. Internal
/// bookkeeping (sequence counters, transport handles) is not exposed.
#[derive(Debug, Clone)]
pub struct StoreSnapshot<R> {
    pub query: Query,
    pub last_result: ResultPage<R>,
    pub is_loading: bool,
    pub initializing: bool,
    pub last_error: Option<DataError>,
    pub selection: HashSet<RecordId>,
    pub current: Option<R>,
    pub draft: Option<EditingDraft<R>>,
}
