//! HTTP client for one remote record collection.
//!
//! [`RestGateway`] is the concrete [`RecordGateway`] over reqwest. The
//! trait exists so the store (and its tests) can run against an
//! in-memory gateway.

use std::marker::PhantomData;

use async_trait::async_trait;

use padron_core::config::ClientConfig;
use padron_core::error::{classify_status, DataError};
use padron_core::query::{Query, ResultPage};
use padron_core::record::{FilterValue, Registro};

use crate::envelope::ApiEnvelope;

/// Wire-shaped parameters for a server-paginated list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub sort: String,
    pub order: &'static str,
    pub search: Option<String>,
    /// Active filter dimensions, values comma-joined per dimension.
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    /// Map a [`Query`] to the remote API's parameter shape. Empty filter
    /// dimensions are omitted entirely.
    pub fn from_query(query: &Query) -> Self {
        let filters = query
            .active_filters()
            .map(|(dimension, accepted)| {
                let joined = accepted
                    .iter()
                    .map(filter_value_param)
                    .collect::<Vec<_>>()
                    .join(",");
                (dimension.clone(), joined)
            })
            .collect();

        Self {
            page: query.page,
            limit: query.page_size,
            sort: query.sort_key.clone(),
            order: query.sort_direction.as_order_param(),
            search: query
                .search_term
                .as_ref()
                .filter(|t| !t.is_empty())
                .cloned(),
            filters,
        }
    }

    /// Flatten into query-string pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("sort".to_string(), self.sort.clone()),
            ("order".to_string(), self.order.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

fn filter_value_param(value: &FilterValue) -> String {
    match value {
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::Text(t) => t.clone(),
    }
}

/// One page of records as returned by the remote API, metadata taken
/// verbatim from the envelope.
#[derive(Debug, Clone)]
pub struct ListPage<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub total_pages: u32,
    /// Page echoed back by the server, when it sent one.
    pub current_page: Option<u32>,
}

impl<R> ListPage<R> {
    /// Promote into a [`ResultPage`], falling back to the requested page
    /// when the server did not echo one.
    pub fn into_result_page(self, requested_page: u32) -> ResultPage<R> {
        ResultPage {
            items: self.items,
            total_count: self.total_count,
            total_pages: self.total_pages,
            current_page: self.current_page.unwrap_or(requested_page),
        }
    }
}

/// Verb-shaped calls against one remote collection.
#[async_trait]
pub trait RecordGateway<R: Registro>: Send + Sync {
    /// Paged, sorted, filtered list query.
    async fn list(&self, params: &ListParams) -> Result<ListPage<R>, DataError>;

    /// Fetch the entire collection, for the client-side pipeline strategy.
    async fn fetch_all(&self) -> Result<Vec<R>, DataError>;

    /// Fetch a single record by id.
    async fn get(&self, id: &str) -> Result<R, DataError>;

    /// Create a record; the remote system assigns the id.
    async fn create(&self, input: serde_json::Value) -> Result<R, DataError>;

    /// Partially update a record.
    async fn update(&self, id: &str, input: serde_json::Value) -> Result<R, DataError>;

    /// Soft-delete a record (sets `deletedAt` server-side).
    async fn delete(&self, id: &str) -> Result<(), DataError>;
}

/// HTTP implementation of [`RecordGateway`] for `R::COLLECTION`.
pub struct RestGateway<R> {
    client: reqwest::Client,
    base_url: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Registro> RestGateway<R> {
    /// Create a gateway from client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .expect("failed to build HTTP client");
        Self::with_client(client, config.api_base_url.clone())
    }

    /// Create a gateway reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across collections).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            _record: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/api/{}", self.base_url, R::COLLECTION)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, R::COLLECTION, id)
    }

    /// Read the body and turn the envelope into a success payload or a
    /// classified [`DataError`].
    ///
    /// The body is parsed even on non-2xx statuses: that is where the
    /// server puts `message` and `errores`. A `success=false` inside a
    /// 2xx response is treated like a failed request.
    async fn parse_envelope<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>, DataError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            let (message, field_errors) =
                match ApiEnvelope::<serde_json::Value>::from_body(&body) {
                    Ok(env) => (env.message, env.field_errors),
                    Err(_) => (None, None),
                };
            return Err(classify_status(status, R::ENTITY, message, field_errors));
        }

        let envelope: ApiEnvelope<T> = ApiEnvelope::from_body(&body).map_err(|e| {
            DataError::Unknown {
                message: format!("malformed response from server: {e}"),
            }
        })?;

        if !envelope.success {
            return Err(DataError::Unknown {
                message: envelope
                    .message
                    .unwrap_or_else(|| "respuesta no exitosa del servidor".to_string()),
            });
        }

        Ok(envelope)
    }
}

/// A reqwest error at send time means the request never produced a
/// server response.
fn send_error(e: reqwest::Error) -> DataError {
    DataError::Network(e.to_string())
}

#[async_trait]
impl<R: Registro> RecordGateway<R> for RestGateway<R> {
    async fn list(&self, params: &ListParams) -> Result<ListPage<R>, DataError> {
        tracing::debug!(
            collection = R::COLLECTION,
            page = params.page,
            search = params.search.as_deref().unwrap_or(""),
            "Listing records"
        );

        let response = self
            .client
            .get(self.collection_url())
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(send_error)?;

        let envelope: ApiEnvelope<Vec<R>> = self.parse_envelope(response).await?;
        Ok(ListPage {
            items: envelope.data.unwrap_or_default(),
            total_count: envelope.count.unwrap_or(0),
            total_pages: envelope.total_pages.unwrap_or(1),
            current_page: envelope.current_page,
        })
    }

    async fn fetch_all(&self) -> Result<Vec<R>, DataError> {
        tracing::debug!(collection = R::COLLECTION, "Fetching full collection");

        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(send_error)?;

        let envelope: ApiEnvelope<Vec<R>> = self.parse_envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn get(&self, id: &str) -> Result<R, DataError> {
        let response = self
            .client
            .get(self.record_url(id))
            .send()
            .await
            .map_err(send_error)?;

        let envelope: ApiEnvelope<R> = self.parse_envelope(response).await?;
        envelope.data.ok_or_else(|| DataError::NotFound {
            entity: R::ENTITY.to_string(),
        })
    }

    async fn create(&self, input: serde_json::Value) -> Result<R, DataError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(&input)
            .send()
            .await
            .map_err(send_error)?;

        let envelope: ApiEnvelope<R> = self.parse_envelope(response).await?;
        envelope.data.ok_or_else(|| DataError::Unknown {
            message: "create returned no record".to_string(),
        })
    }

    async fn update(&self, id: &str, input: serde_json::Value) -> Result<R, DataError> {
        let response = self
            .client
            .put(self.record_url(id))
            .json(&input)
            .send()
            .await
            .map_err(send_error)?;

        let envelope: ApiEnvelope<R> = self.parse_envelope(response).await?;
        envelope.data.ok_or_else(|| DataError::Unknown {
            message: "update returned no record".to_string(),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), DataError> {
        let response = self
            .client
            .delete(self.record_url(id))
            .send()
            .await
            .map_err(send_error)?;

        let _: ApiEnvelope<serde_json::Value> = self.parse_envelope(response).await?;
        Ok(())
    }
}
