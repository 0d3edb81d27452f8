//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchApiClient`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::{
        headers::{HeaderName, HeaderValue},
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsAliasParts, IndicesExistsParts, IndicesPutAliasParts},
    DeleteParts, IndexParts, OpenSearch,
};
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::SearchApiConfig;
use crate::errors::SearchApiError;
use crate::interfaces::SearchApiClient;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::ApiOutcome;
use disqualified_search_shared::DisqualifiedOfficerDocument;

/// Header carrying the correlation id of the change envelope.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// OpenSearch client implementation.
///
/// Documents are written with `PUT /{alias}/_doc/{id}` and removed with
/// `DELETE /{alias}/_doc/{id}`. Both operations are idempotent.
///
/// # Example
///
/// ```ignore
/// use disqualified_search_repository::{OpenSearchClient, SearchApiConfig};
/// use disqualified_search_repository::opensearch::IndexConfig;
///
/// let config = SearchApiConfig::new("http://localhost:9200", IndexConfig::default());
/// let client = OpenSearchClient::new(config)?;
/// let outcome = client.upsert("context_id", "123456789", &document).await;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_config: IndexConfig,
    request_timeout: Duration,
}

impl OpenSearchClient {
    /// Create a new client for the configured URL.
    ///
    /// No request is sent here; connectivity is checked by `ensure_index_exists`.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchApiError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: SearchApiConfig) -> Result<Self, SearchApiError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchApiError::configuration(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchApiError::connection(e.to_string()))?;

        info!(
            url = %config.url,
            alias = %config.index.alias,
            version = config.index.version,
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            index_config: config.index,
            request_timeout: config.request_timeout,
        })
    }

    /// Build the request id header value, skipping ids that are not valid header text.
    fn request_id(context_id: &str) -> Option<HeaderValue> {
        match HeaderValue::from_str(context_id) {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(context_id = %context_id, "Context id is not a valid header value");
                None
            }
        }
    }

    /// Create the versioned index with mappings if it doesn't exist yet.
    async fn ensure_versioned_index(&self, index_name: &str) -> Result<(), SearchApiError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index_name]))
            .send()
            .await
            .map_err(|e| SearchApiError::connection(e.to_string()))?;

        let status = response.status_code().as_u16();
        if status == 200 {
            debug!(index = %index_name, "Index already exists");
            return Ok(());
        }
        if status != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchApiError::unexpected_status(status, body));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index_name))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| SearchApiError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Another instance may have created the index in the meantime
            if body.contains("resource_already_exists_exception") {
                warn!(index = %index_name, "Index was created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %body, "Index creation failed");
            return Err(SearchApiError::index_creation(format!(
                "Creating index {} failed with status {}: {}",
                index_name, status, body
            )));
        }

        info!(index = %index_name, "Created search index");
        Ok(())
    }

    /// Point the alias at the versioned index if the alias doesn't exist yet.
    async fn ensure_alias(&self, index_name: &str) -> Result<(), SearchApiError> {
        let alias = self.index_config.alias.as_str();

        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchApiError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            debug!(alias = %alias, "Alias already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(&[index_name], alias))
            .body(json!({}))
            .send()
            .await
            .map_err(|e| SearchApiError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Alias creation failed");
            return Err(SearchApiError::index_creation(format!(
                "Creating alias {} failed with status {}: {}",
                alias, status, body
            )));
        }

        info!(alias = %alias, index = %index_name, "Created search index alias");
        Ok(())
    }
}

#[async_trait]
impl SearchApiClient for OpenSearchClient {
    async fn ensure_index_exists(&self) -> Result<(), SearchApiError> {
        let index_name = self.index_config.versioned_index_name();
        self.ensure_versioned_index(&index_name).await?;
        self.ensure_alias(&index_name).await
    }

    async fn upsert(
        &self,
        context_id: &str,
        id: &str,
        document: &DisqualifiedOfficerDocument,
    ) -> ApiOutcome {
        let mut request = self
            .client
            .index(IndexParts::IndexId(&self.index_config.alias, id))
            .request_timeout(self.request_timeout);
        if let Some(value) = Self::request_id(context_id) {
            request = request.header(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        let response = match request.body(document).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(context_id = %context_id, resource_id = %id, error = %e, "Upsert request failed");
                return ApiOutcome::transport_failure(e.to_string());
            }
        };

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(
                context_id = %context_id,
                resource_id = %id,
                status = %status,
                body = %error_body,
                "Upsert request rejected"
            );
            return ApiOutcome::from_status(status.as_u16());
        }

        debug!(context_id = %context_id, resource_id = %id, "Document upserted");
        ApiOutcome::Success
    }

    async fn remove(&self, context_id: &str, id: &str) -> ApiOutcome {
        let mut request = self
            .client
            .delete(DeleteParts::IndexId(&self.index_config.alias, id))
            .request_timeout(self.request_timeout);
        if let Some(value) = Self::request_id(context_id) {
            request = request.header(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(context_id = %context_id, resource_id = %id, error = %e, "Delete request failed");
                return ApiOutcome::transport_failure(e.to_string());
            }
        };

        let status = response.status_code().as_u16();
        let body = if (200..300).contains(&status) {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        let outcome = delete_outcome(status, &body);
        if outcome.is_success() {
            debug!(context_id = %context_id, resource_id = %id, status = status, "Document removed");
        } else {
            error!(
                context_id = %context_id,
                resource_id = %id,
                status = ?outcome.status(),
                body = %body,
                "Delete request rejected"
            );
        }
        outcome
    }
}

/// Outcome of a delete request from its status and response body.
///
/// A 404 only means the document is already absent when the body reports
/// `"result": "not_found"`. A missing index also answers 404 and is a client
/// error.
fn delete_outcome(status: u16, body: &str) -> ApiOutcome {
    if status == 404 {
        let document_absent = serde_json::from_str::<serde_json::Value>(body)
            .map(|value| value["result"] == "not_found")
            .unwrap_or(false);
        return if document_absent {
            ApiOutcome::Success
        } else {
            ApiOutcome::ClientError { status }
        };
    }
    ApiOutcome::from_status(status)
}
