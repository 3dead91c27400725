//! List-resolution strategies.
//!
//! The store resolves queries through one [`FetchStrategy`]: either the
//! remote API pages/sorts/filters natively ([`ServerPaginated`]), or the
//! whole collection is fetched once and the local pipeline does the rest
//! ([`ClientPipeline`]). The consuming surface is identical either way.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use padron_core::error::DataError;
use padron_core::query::{Query, ResultPage};
use padron_core::record::Registro;
use padron_gateway::{ListParams, RecordGateway};

/// Resolves one query into one page of results.
#[async_trait]
pub trait FetchStrategy<R: Registro>: Send + Sync {
    async fn resolve(&self, query: &Query) -> Result<ResultPage<R>, DataError>;

    /// Drop any cached data. Called after a write or a live event so the
    /// next resolve observes the change.
    async fn invalidate(&self);
}

/// Thin adapter over a gateway that supports paged queries natively.
///
/// Trusts the returned envelope's count metadata verbatim; performs no
/// local filtering or sorting.
pub struct ServerPaginated<R> {
    gateway: Arc<dyn RecordGateway<R>>,
}

impl<R: Registro> ServerPaginated<R> {
    pub fn new(gateway: Arc<dyn RecordGateway<R>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<R: Registro> FetchStrategy<R> for ServerPaginated<R> {
    async fn resolve(&self, query: &Query) -> Result<ResultPage<R>, DataError> {
        let params = ListParams::from_query(query);
        let page = self.gateway.list(&params).await?;
        Ok(page.into_result_page(query.page))
    }

    async fn invalidate(&self) {
        // Nothing cached; every resolve hits the server.
    }
}

/// Full-fetch strategy: one `fetch_all`, cached until invalidated, with
/// search/filter/sort/slice recomputed locally on every resolve.
pub struct ClientPipeline<R> {
    gateway: Arc<dyn RecordGateway<R>>,
    cache: Mutex<Option<Vec<R>>>,
}

impl<R: Registro> ClientPipeline<R> {
    pub fn new(gateway: Arc<dyn RecordGateway<R>>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<R: Registro> FetchStrategy<R> for ClientPipeline<R> {
    async fn resolve(&self, query: &Query) -> Result<ResultPage<R>, DataError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            let fetched = self.gateway.fetch_all().await?;
            tracing::debug!(
                collection = R::COLLECTION,
                count = fetched.len(),
                "Cached full collection"
            );
            *cache = Some(fetched);
        }
        let records = cache.as_deref().unwrap_or(&[]);
        Ok(padron_pipeline::apply(records, query))
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}
