//! Graph store access over the SPARQL 1.1 protocol.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::results::SelectResults;

pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// A SPARQL endpoint that answers SELECT queries.
///
/// Implementations must not keep per-query state: concurrent requests share
/// one handle.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn select(&self, query: &str) -> Result<SelectResults, StoreError>;

    fn endpoint(&self) -> &str;
}

/// Blazegraph (or any SPARQL 1.1 endpoint) reached over HTTP.
pub struct SparqlHttpStore {
    client: Client,
    endpoint: String,
}

impl SparqlHttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl GraphStore for SparqlHttpStore {
    async fn select(&self, query: &str) -> Result<SelectResults, StoreError> {
        // The serializer is !Send; finish it before the first await.
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("query", query)
            .finish();

        // Query via URL-encoded POST; the request is built fresh for every
        // call so nothing leaks between concurrent queries.
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
