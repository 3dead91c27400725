//! In-memory test doubles for the store: a gateway over a `Vec<Empresa>`
//! and a strategy with scripted delays and failure injection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use padron_core::config::ClientConfig;
use padron_core::empresa::{Empresa, EmpresaInput};
use padron_core::error::DataError;
use padron_core::query::{Query, ResultPage, SortDirection};
use padron_core::record::{FilterValue, Registro};
use padron_events::EventBus;
use padron_gateway::{ListPage, ListParams, RecordGateway};
use padron_store::{CollectionStore, FetchStrategy, ServerPaginated};

pub fn empresa(id: &str, nombre: &str, nit: &str, requiere_osi: bool) -> Empresa {
    serde_json::from_value(serde_json::json!({
        "id": id, "nombre": nombre, "nit": nit,
        "representante": "Ana Rojas", "cedula": "1020304050",
        "telefono": "3001234567", "direccion": "Cra 1 # 2-3",
        "requiere_osi": requiere_osi, "paga_recargos": false
    }))
    .unwrap()
}

pub fn valid_input(nombre: &str, nit: &str) -> EmpresaInput {
    EmpresaInput {
        nombre: nombre.into(),
        nit: nit.into(),
        representante: "Ana Rojas".into(),
        cedula: "1020304050".into(),
        telefono: "3001234567".into(),
        direccion: "Cra 1 # 2-3".into(),
        requiere_osi: false,
        paga_recargos: false,
    }
}

/// Reconstruct the query a real server would evaluate from the wire
/// parameters, so `list` behaves like the remote API.
fn query_from(params: &ListParams) -> Query {
    let mut q = Query::new(params.sort.clone());
    q.page = params.page;
    q.page_size = params.limit;
    q.search_term = params.search.clone();
    q.sort_direction = if params.order == "DESC" {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    for (dimension, joined) in &params.filters {
        let accepted = q.filters.entry(dimension.clone()).or_default();
        for value in joined.split(',') {
            accepted.insert(match value {
                "true" => FilterValue::Bool(true),
                "false" => FilterValue::Bool(false),
                other => FilterValue::Text(other.to_string()),
            });
        }
    }
    q
}

/// In-memory gateway over a mutable record set. Write failures can be
/// injected with [`MockGateway::fail_next`]; call counts are observable.
pub struct MockGateway {
    records: Mutex<Vec<Empresa>>,
    next_id: AtomicU64,
    fail_next: Mutex<VecDeque<DataError>>,
    pub list_calls: AtomicU64,
    pub create_calls: AtomicU64,
}

impl MockGateway {
    pub fn new(seed: Vec<Empresa>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(seed),
            next_id: AtomicU64::new(100),
            fail_next: Mutex::new(VecDeque::new()),
            list_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
        })
    }

    /// Queue an error; the next gateway call consumes and returns it.
    pub fn fail_next(&self, error: DataError) {
        self.fail_next.lock().unwrap().push_back(error);
    }

    pub fn all(&self) -> Vec<Empresa> {
        self.records.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<DataError> {
        self.fail_next.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl RecordGateway<Empresa> for MockGateway {
    async fn list(&self, params: &ListParams) -> Result<ListPage<Empresa>, DataError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        let page = padron_pipeline::apply(&self.all(), &query_from(params));
        Ok(ListPage {
            items: page.items,
            total_count: page.total_count,
            total_pages: page.total_pages,
            current_page: Some(page.current_page),
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Empresa>, DataError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.all())
    }

    async fn get(&self, id: &str) -> Result<Empresa, DataError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.all()
            .into_iter()
            .find(|r| r.id == id && r.deleted_at.is_none())
            .ok_or_else(|| DataError::NotFound {
                entity: Empresa::ENTITY.to_string(),
            })
    }

    async fn create(&self, input: serde_json::Value) -> Result<Empresa, DataError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut value = input;
        value["id"] = serde_json::json!(format!("e{id}"));
        let record: Empresa = serde_json::from_value(value).map_err(|e| DataError::Unknown {
            message: e.to_string(),
        })?;
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, input: serde_json::Value) -> Result<Empresa, DataError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DataError::NotFound {
                entity: Empresa::ENTITY.to_string(),
            })?;
        let mut value = serde_json::to_value(&*existing).unwrap();
        if let (Some(target), Some(patch)) = (value.as_object_mut(), input.as_object()) {
            for (k, v) in patch {
                target.insert(k.clone(), v.clone());
            }
        }
        *existing = serde_json::from_value(value).map_err(|e| DataError::Unknown {
            message: e.to_string(),
        })?;
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), DataError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DataError::NotFound {
                entity: Empresa::ENTITY.to_string(),
            })?;
        existing.deleted_at = Some(chrono::Utc::now());
        Ok(())
    }
}

/// Strategy over the mock gateway's records with observable resolve
/// calls and a script of per-resolve delays, for racing responses under
/// a paused clock.
pub struct MemoryStrategy {
    gateway: Arc<MockGateway>,
    pub resolve_calls: AtomicU64,
    delays: Mutex<VecDeque<Duration>>,
    fail_next: Mutex<VecDeque<DataError>>,
}

impl MemoryStrategy {
    pub fn new(gateway: Arc<MockGateway>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            resolve_calls: AtomicU64::new(0),
            delays: Mutex::new(VecDeque::new()),
            fail_next: Mutex::new(VecDeque::new()),
        })
    }

    /// Each queued delay is consumed by one resolve, in call order.
    pub fn script_delays(&self, delays: &[Duration]) {
        self.delays.lock().unwrap().extend(delays.iter().copied());
    }

    pub fn fail_next(&self, error: DataError) {
        self.fail_next.lock().unwrap().push_back(error);
    }
}

#[async_trait]
impl FetchStrategy<Empresa> for MemoryStrategy {
    async fn resolve(&self, query: &Query) -> Result<ResultPage<Empresa>, DataError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.fail_next.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(padron_pipeline::apply(&self.gateway.all(), query))
    }

    async fn invalidate(&self) {
        // Records are read fresh on every resolve.
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        first_load_timeout_secs: 5,
        ..ClientConfig::default()
    }
}

/// Store over the in-memory strategy, no live bridge.
pub fn fixture(
    seed: Vec<Empresa>,
) -> (
    Arc<CollectionStore<Empresa>>,
    Arc<MockGateway>,
    Arc<MemoryStrategy>,
) {
    let gateway = MockGateway::new(seed);
    let strategy = MemoryStrategy::new(Arc::clone(&gateway));
    let store = CollectionStore::new(
        gateway.clone(),
        strategy.clone(),
        Arc::new(EventBus::default()),
        &test_config(),
    );
    (store, gateway, strategy)
}

/// Store over the server-paginated strategy, exercising the wire-param
/// mapping end to end.
pub fn server_fixture(seed: Vec<Empresa>) -> (Arc<CollectionStore<Empresa>>, Arc<MockGateway>) {
    let gateway = MockGateway::new(seed);
    let strategy = Arc::new(ServerPaginated::new(
        gateway.clone() as Arc<dyn RecordGateway<Empresa>>
    ));
    let store = CollectionStore::new(
        gateway.clone(),
        strategy,
        Arc::new(EventBus::default()),
        &test_config(),
    );
    (store, gateway)
}
