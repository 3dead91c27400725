//! The collection state store.
//!
//! One [`CollectionStore`] per managed collection. It owns the active
//! query, the last resolved result page, loading/error flags, the
//! selection, and the editing draft, and it keeps them mutually
//! consistent under interleaved user actions, write round-trips, and
//! live push events.
//!
//! Every read goes through the fetch strategy and is tagged with a
//! monotonically increasing sequence number; only the response for the
//! most recently issued request is applied, so a response computed for a
//! superseded query can never reach the screen, whichever order the
//! responses arrive in.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use padron_core::config::{ClientConfig, PaginationMode};
use padron_core::error::{field_errors_from, DataError};
use padron_core::query::{clamp_page, SortDirection};
use padron_core::record::{FilterValue, Registro};
use padron_events::{DomainEvent, EventBus, EventKind};
use padron_gateway::{RecordGateway, RestGateway};
use padron_pipeline::filter::matches_filters;
use padron_pipeline::search::matches_search;
use padron_pipeline::sort::compare_records;
use padron_realtime::{LiveEvent, LiveUpdateBridge};

use crate::state::{EditingDraft, EventLogEntry, StoreSnapshot, StoreState};
use crate::strategy::{ClientPipeline, FetchStrategy, ServerPaginated};

/// State store for one remote collection.
///
/// Constructed once per collection via [`CollectionStore::from_config`]
/// (or the explicit constructors, in tests) and shared as an `Arc`.
pub struct CollectionStore<R: Registro> {
    state: RwLock<StoreState<R>>,
    strategy: Arc<dyn FetchStrategy<R>>,
    gateway: Arc<dyn RecordGateway<R>>,
    bus: Arc<EventBus>,
    bridge: Option<Arc<LiveUpdateBridge>>,
    /// Sequence number of the most recently issued resolve.
    seq: AtomicU64,
    first_load_timeout: Duration,
    /// Cancels the live-merge task on dispose.
    cancel: CancellationToken,
    tasks: std::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<R: Registro> CollectionStore<R> {
    /// Build a store with explicit collaborators and no live channel.
    pub fn new(
        gateway: Arc<dyn RecordGateway<R>>,
        strategy: Arc<dyn FetchStrategy<R>>,
        bus: Arc<EventBus>,
        config: &ClientConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(StoreState::new(config.page_size)),
            strategy,
            gateway,
            bus,
            bridge: None,
            seq: AtomicU64::new(0),
            first_load_timeout: config.first_load_timeout(),
            cancel: CancellationToken::new(),
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Build a store with explicit collaborators and a live-update bridge.
    pub fn with_bridge(
        gateway: Arc<dyn RecordGateway<R>>,
        strategy: Arc<dyn FetchStrategy<R>>,
        bus: Arc<EventBus>,
        bridge: Arc<LiveUpdateBridge>,
        config: &ClientConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(StoreState::new(config.page_size)),
            strategy,
            gateway,
            bus,
            bridge: Some(bridge),
            seq: AtomicU64::new(0),
            first_load_timeout: config.first_load_timeout(),
            cancel: CancellationToken::new(),
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Build the production wiring for one collection: HTTP gateway,
    /// strategy per [`ClientConfig::pagination_mode`], fresh event bus,
    /// and a live-update bridge on the configured WebSocket URL.
    pub fn from_config(config: &ClientConfig) -> Arc<Self> {
        let gateway: Arc<dyn RecordGateway<R>> = Arc::new(RestGateway::<R>::new(config));
        let strategy: Arc<dyn FetchStrategy<R>> = match config.pagination_mode {
            PaginationMode::Server => Arc::new(ServerPaginated::new(Arc::clone(&gateway))),
            PaginationMode::Client => Arc::new(ClientPipeline::new(Arc::clone(&gateway))),
        };
        let bridge = LiveUpdateBridge::new(config.ws_base_url.clone());
        Self::with_bridge(gateway, strategy, Arc::new(EventBus::default()), bridge, config)
    }

    /// Bus on which this store publishes its domain events.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Whether the live-update channel is currently connected.
    pub fn is_live_connected(&self) -> bool {
        self.bridge.as_ref().is_some_and(|b| b.is_connected())
    }

    /// Read-only view of the current state.
    pub async fn snapshot(&self) -> StoreSnapshot<R> {
        let state = self.state.read().await;
        StoreSnapshot {
            query: state.query.clone(),
            last_result: state.last_result.clone(),
            is_loading: state.is_loading,
            initializing: state.initializing,
            last_error: state.last_error.clone(),
            selection: state.selection.clone(),
            current: state.current.clone(),
            draft: state.draft.clone(),
        }
    }

    /// Most recent live events, oldest first.
    pub async fn event_log(&self) -> Vec<EventLogEntry> {
        self.state.read().await.event_log.iter().cloned().collect()
    }

    pub async fn clear_event_log(&self) {
        self.state.write().await.event_log.clear();
    }

    // -- lifecycle ------------------------------------------------------------

    /// Start the store: kick off the first resolve, arm the first-load
    /// window, and (when a bridge and a user identity are present) open
    /// the live-update subscription and the merge task.
    pub async fn init(self: &Arc<Self>, user_id: Option<&str>) {
        self.state.write().await.initializing = true;

        let store = Arc::clone(self);
        let resolve_task = tokio::spawn(async move {
            if let Err(e) = store.resolve().await {
                tracing::warn!(collection = R::COLLECTION, error = %e, "Initial load failed");
            }
        });

        // The blocking first-load screen must give way even if the first
        // resolve never settles.
        let store = Arc::clone(self);
        let timeout = self.first_load_timeout;
        let timeout_task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut state = store.state.write().await;
            if state.initializing {
                tracing::warn!(
                    collection = R::COLLECTION,
                    "First load still pending after {:?}, releasing the initial screen",
                    timeout,
                );
                state.initializing = false;
            }
        });

        let mut tasks = vec![resolve_task, timeout_task];

        if let (Some(bridge), Some(user_id)) = (self.bridge.as_ref(), user_id) {
            bridge.connect(user_id).await;
            let store = Arc::clone(self);
            let mut rx = bridge.subscribe();
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(async move {
                store.merge_loop(&mut rx, cancel).await;
            }));
        }

        if let Ok(mut handles) = self.tasks.lock() {
            handles.extend(tasks);
        }
    }

    /// Stop background work: tear down the live subscription and cancel
    /// the merge task. The store itself stays readable.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        if let Some(bridge) = &self.bridge {
            bridge.disconnect().await;
        }
        if let Ok(mut handles) = self.tasks.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }

    // -- query mutations ------------------------------------------------------

    /// Re-run the active query through the strategy.
    ///
    /// Tagged with a fresh sequence number. The response is applied only
    /// if this is still the latest-issued request when it settles: a
    /// response is stale the moment a newer request exists, whether or
    /// not that newer response has arrived yet.
    pub async fn resolve(&self) -> Result<(), DataError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut state = self.state.write().await;
            state.is_loading = true;
            state.query.clone()
        };

        let outcome = self.strategy.resolve(&query).await;

        let mut state = self.state.write().await;
        if seq != self.seq.load(Ordering::SeqCst) {
            tracing::debug!(collection = R::COLLECTION, seq, "Discarding stale resolve");
            return Ok(());
        }
        state.is_loading = false;

        match outcome {
            Ok(page) => {
                // The strategy may have clamped the requested page.
                state.query.page = page.current_page;
                state.last_result = page;
                state.last_error = None;
                state.initializing = false;
                Ok(())
            }
            Err(e) => {
                // The list keeps its last-good data; only the error slot
                // changes.
                tracing::warn!(collection = R::COLLECTION, error = %e, "Resolve failed");
                state.last_error = Some(e.clone());
                state.initializing = false;
                Err(e)
            }
        }
    }

    /// Record what the user is typing without touching the committed
    /// query. No resolve happens until [`commit_search`](Self::commit_search).
    pub async fn stage_search_term(&self, term: impl Into<String>) {
        self.state.write().await.staged_search = Some(term.into());
    }

    /// Commit the staged search term and resolve from page 1. A blank
    /// staged term clears the committed one.
    pub async fn commit_search(&self) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            let staged = state.staged_search.take().unwrap_or_default();
            let trimmed = staged.trim();
            state.query.search_term =
                (!trimmed.is_empty()).then(|| trimmed.to_string());
            state.query.page = 1;
        }
        self.resolve().await
    }

    /// Replace all filter dimensions at once and resolve from page 1.
    pub async fn set_filters(
        &self,
        filters: BTreeMap<String, BTreeSet<FilterValue>>,
    ) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            state.query.filters = filters;
            state.query.page = 1;
        }
        self.resolve().await
    }

    /// Replace the accepted-value set of one filter dimension and resolve
    /// from page 1. An empty set deactivates the dimension.
    pub async fn set_filter(
        &self,
        dimension: impl Into<String>,
        accepted: BTreeSet<FilterValue>,
    ) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            state.query.filters.insert(dimension.into(), accepted);
            state.query.page = 1;
        }
        self.resolve().await
    }

    /// Change the sort key and direction and resolve from page 1.
    pub async fn set_sort(
        &self,
        key: impl Into<String>,
        direction: SortDirection,
    ) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            state.query.sort_key = key.into();
            state.query.sort_direction = direction;
            state.query.page = 1;
        }
        self.resolve().await
    }

    /// Navigate to a page, clamped to the last known page count. Asking
    /// for the page already shown is a no-op (no request is issued).
    pub async fn set_page(&self, page: u32) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            let target = clamp_page(page, state.last_result.total_pages);
            if target == state.query.page {
                return Ok(());
            }
            state.query.page = target;
        }
        self.resolve().await
    }

    /// Clear search and filters, return to page 1 (sort is preserved),
    /// and resolve. Idempotent.
    pub async fn reset_query(&self) -> Result<(), DataError> {
        {
            let mut state = self.state.write().await;
            state.query.reset();
            state.staged_search = None;
        }
        self.resolve().await
    }

    // -- writes ---------------------------------------------------------------

    /// Create a record, then refresh the current query so the list shows
    /// server truth (ordering, pagination) rather than a local guess.
    ///
    /// Validation runs client-side first; a rejected input never reaches
    /// the gateway. On any failure the editing draft stays open and the
    /// error is both stored and returned.
    pub async fn create_record<I>(&self, input: &I) -> Result<R, DataError>
    where
        I: Serialize + Validate + Sync,
    {
        if let Err(errors) = input.validate() {
            let e = DataError::ValidationFailed(field_errors_from(&errors));
            return Err(self.record_write_failure(e).await);
        }

        let payload = serde_json::to_value(input).map_err(|e| DataError::Unknown {
            message: format!("could not serialize input: {e}"),
        })?;

        match self.gateway.create(payload).await {
            Ok(record) => {
                tracing::info!(
                    collection = R::COLLECTION,
                    id = record.id(),
                    "Record created"
                );
                self.strategy.invalidate().await;
                {
                    let mut state = self.state.write().await;
                    state.draft = None;
                    state.last_error = None;
                }
                self.bus.publish(
                    DomainEvent::new(EventKind::RecordCreated, R::ENTITY)
                        .with_record(record.id(), record.display_name()),
                );
                self.resolve().await?;
                Ok(record)
            }
            Err(e) => Err(self.record_write_failure(e).await),
        }
    }

    /// Update a record, then refresh the current query. Same failure
    /// contract as [`create_record`](Self::create_record).
    pub async fn update_record<I>(&self, id: &str, input: &I) -> Result<R, DataError>
    where
        I: Serialize + Validate + Sync,
    {
        if let Err(errors) = input.validate() {
            let e = DataError::ValidationFailed(field_errors_from(&errors));
            return Err(self.record_write_failure(e).await);
        }

        let payload = serde_json::to_value(input).map_err(|e| DataError::Unknown {
            message: format!("could not serialize input: {e}"),
        })?;

        match self.gateway.update(id, payload).await {
            Ok(record) => {
                tracing::info!(collection = R::COLLECTION, id, "Record updated");
                self.strategy.invalidate().await;
                {
                    let mut state = self.state.write().await;
                    state.draft = None;
                    state.last_error = None;
                    if state.current.as_ref().is_some_and(|c| c.id() == id) {
                        state.current = Some(record.clone());
                    }
                }
                self.bus.publish(
                    DomainEvent::new(EventKind::RecordUpdated, R::ENTITY)
                        .with_record(record.id(), record.display_name()),
                );
                self.resolve().await?;
                Ok(record)
            }
            Err(e) => Err(self.record_write_failure(e).await),
        }
    }

    /// Soft-delete a record, drop it from the selection, and refresh the
    /// current query.
    pub async fn delete_record(&self, id: &str) -> Result<(), DataError> {
        let display_name = {
            let state = self.state.read().await;
            state
                .last_result
                .items
                .iter()
                .find(|r| r.id() == id)
                .map(Registro::display_name)
        };

        match self.gateway.delete(id).await {
            Ok(()) => {
                tracing::info!(collection = R::COLLECTION, id, "Record deleted");
                self.strategy.invalidate().await;
                {
                    let mut state = self.state.write().await;
                    state.selection.remove(id);
                    state.last_error = None;
                    if state.current.as_ref().is_some_and(|c| c.id() == id) {
                        state.current = None;
                    }
                }
                self.bus.publish(
                    DomainEvent::new(EventKind::RecordDeleted, R::ENTITY)
                        .with_record(id, display_name.unwrap_or_default()),
                );
                self.resolve().await?;
                Ok(())
            }
            Err(e) => Err(self.record_write_failure(e).await),
        }
    }

    /// Load one record into the detail slot.
    pub async fn fetch_record(&self, id: &str) -> Result<R, DataError> {
        match self.gateway.get(id).await {
            Ok(record) => {
                self.state.write().await.current = Some(record.clone());
                Ok(record)
            }
            Err(e) => {
                self.state.write().await.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Store a write failure, publish field messages when there are any,
    /// and hand the error back. The draft is deliberately left open.
    async fn record_write_failure(&self, e: DataError) -> DataError {
        tracing::warn!(collection = R::COLLECTION, error = %e, "Write failed");
        self.state.write().await.last_error = Some(e.clone());
        let errors = e.field_errors();
        if !errors.is_empty() {
            self.bus.publish(DomainEvent::new(
                EventKind::ValidationFailed {
                    errors: errors.to_vec(),
                },
                R::ENTITY,
            ));
        }
        e
    }

    // -- selection and editing ------------------------------------------------

    /// Toggle a record in or out of the selection. Selection persists
    /// across page, search, and filter changes.
    pub async fn toggle_selection(&self, id: &str) {
        let mut state = self.state.write().await;
        if !state.selection.remove(id) {
            state.selection.insert(id.to_string());
        }
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
    }

    /// Open the editing surface: `None` starts a create draft, `Some`
    /// an edit draft over the given record.
    pub async fn open_editor(&self, record: Option<R>) {
        let mut state = self.state.write().await;
        state.draft = Some(match record {
            None => EditingDraft::Create,
            Some(r) => EditingDraft::Edit(r),
        });
    }

    /// Discard the draft without persisting anything.
    pub async fn close_editor(&self) {
        self.state.write().await.draft = None;
    }

    /// Acknowledge the last error (e.g. after it has been displayed).
    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    // -- live-update merging --------------------------------------------------

    /// Consume bridge events until cancelled, merging record events for
    /// this store's entity and republishing channel transitions.
    async fn merge_loop(
        &self,
        rx: &mut tokio::sync::broadcast::Receiver<LiveEvent>,
        cancel: CancellationToken,
    ) {
        use tokio::sync::broadcast::error::RecvError;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                event = rx.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(
                            collection = R::COLLECTION,
                            missed,
                            "Live-event receiver lagged",
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => return,
                },
            };

            match event {
                LiveEvent::Connected => {
                    self.bus
                        .publish(DomainEvent::new(EventKind::ChannelConnected, R::ENTITY));
                }
                LiveEvent::Disconnected => {
                    self.bus
                        .publish(DomainEvent::new(EventKind::ChannelDisconnected, R::ENTITY));
                }
                LiveEvent::RecordCreated { entity, data } if entity == R::ENTITY => {
                    match serde_json::from_value::<R>(data.clone()) {
                        Ok(record) => self.on_record_created(record, data).await,
                        Err(e) => {
                            tracing::warn!(entity = %entity, error = %e, "Undecodable created event");
                        }
                    }
                }
                LiveEvent::RecordUpdated { entity, data } if entity == R::ENTITY => {
                    match serde_json::from_value::<R>(data.clone()) {
                        Ok(record) => self.on_record_updated(record, data).await,
                        Err(e) => {
                            tracing::warn!(entity = %entity, error = %e, "Undecodable updated event");
                        }
                    }
                }
                // Other entities' events are not ours to merge.
                LiveEvent::RecordCreated { .. } | LiveEvent::RecordUpdated { .. } => {}
            }
        }
    }

    /// Merge a record another session created.
    ///
    /// Counts are always updated when the record matches the active
    /// query; the record itself only appears when it belongs on the
    /// visible page (sorted position within the slice, or the page has
    /// room). Cached strategy data is invalidated either way.
    pub async fn on_record_created(&self, record: R, raw: serde_json::Value) {
        self.strategy.invalidate().await;

        let merged = {
            let mut state = self.state.write().await;
            state.push_event_log(EventLogEntry {
                event_name: format!("{}:creado", R::ENTITY),
                data: raw,
                received_at: chrono::Utc::now(),
            });

            // The echo of our own create arrives here too.
            let already_listed = state.last_result.items.iter().any(|r| r.id() == record.id());

            let matches = record.deleted_at().is_none()
                && matches_search(&record, state.query.search_term.as_deref().unwrap_or(""))
                && matches_filters(&record, &state.query);

            if matches && !already_listed {
                state.last_result.total_count += 1;
                state.last_result.total_pages = padron_core::query::total_pages(
                    state.last_result.total_count,
                    state.query.page_size,
                );

                let key = state.query.sort_key.clone();
                let direction = state.query.sort_direction;
                let page = state.query.page;
                let page_size = state.query.page_size as usize;
                let items = &mut state.last_result.items;
                let pos = items
                    .iter()
                    .position(|existing| {
                        compare_records(&record, existing, &key, direction) == CmpOrdering::Less
                    })
                    .unwrap_or(items.len());

                // A record sorting before the slice of a later page
                // belongs on an earlier one; past a full page, on a later
                // one. Either way only the counts change here and the
                // next resolve reconciles the slices.
                let before_this_page = page > 1 && pos == 0;
                if !before_this_page && (pos < items.len() || items.len() < page_size) {
                    items.insert(pos, record.clone());
                    items.truncate(page_size);
                }
                true
            } else {
                matches
            }
        };

        tracing::debug!(
            collection = R::COLLECTION,
            id = record.id(),
            merged,
            "Live created event received"
        );
        self.bus.publish(
            DomainEvent::new(EventKind::RecordCreated, R::ENTITY)
                .with_record(record.id(), record.display_name()),
        );
    }

    /// Merge a record another session updated: replace it in place on
    /// the visible page and in the detail slot. A record that stopped
    /// matching the query (or was soft-deleted) is removed instead.
    pub async fn on_record_updated(&self, record: R, raw: serde_json::Value) {
        self.strategy.invalidate().await;

        {
            let mut state = self.state.write().await;
            state.push_event_log(EventLogEntry {
                event_name: format!("{}:actualizado", R::ENTITY),
                data: raw,
                received_at: chrono::Utc::now(),
            });

            let matches = record.deleted_at().is_none()
                && matches_search(&record, state.query.search_term.as_deref().unwrap_or(""))
                && matches_filters(&record, &state.query);

            if let Some(pos) = state
                .last_result
                .items
                .iter()
                .position(|r| r.id() == record.id())
            {
                if matches {
                    state.last_result.items[pos] = record.clone();
                } else {
                    state.last_result.items.remove(pos);
                    state.last_result.total_count =
                        state.last_result.total_count.saturating_sub(1);
                    state.last_result.total_pages = padron_core::query::total_pages(
                        state.last_result.total_count,
                        state.query.page_size,
                    );
                }
            }

            if state
                .current
                .as_ref()
                .is_some_and(|c| c.id() == record.id())
            {
                state.current = Some(record.clone());
            }
        }

        tracing::debug!(
            collection = R::COLLECTION,
            id = record.id(),
            "Live updated event received"
        );
        self.bus.publish(
            DomainEvent::new(EventKind::RecordUpdated, R::ENTITY)
                .with_record(record.id(), record.display_name()),
        );
    }
}
