//! Search API client trait definition.
//!
//! This module defines the abstract interface for applying documents to the
//! search index, allowing for different backend implementations and for mock
//! implementations in tests.

use async_trait::async_trait;

use crate::errors::SearchApiError;
use crate::types::ApiOutcome;
use disqualified_search_shared::DisqualifiedOfficerDocument;

/// Abstracts the underlying search index API.
///
/// Document operations are keyed by the resource id of the change envelope and
/// are idempotent: applying the same `upsert` or `remove` twice leaves the index
/// in the same state as applying it once. This is what makes redelivery of a
/// message safe.
///
/// Document operations do not return `Result`. Every call resolves to an
/// [`ApiOutcome`] which distinguishes rejected requests (4xx) from transient
/// failures (5xx, transport). Implementations must not retry internally and must
/// tolerate concurrent use from several workers.
#[async_trait]
pub trait SearchApiClient: Send + Sync {
    /// Ensure the search index and alias exist, creating them if necessary.
    ///
    /// Called once during startup before any document is applied.
    async fn ensure_index_exists(&self) -> Result<(), SearchApiError>;

    /// Create or fully replace the document stored under `id`.
    ///
    /// # Arguments
    ///
    /// * `context_id` - Correlation id forwarded with the request
    /// * `id` - The resource id used as the document key
    /// * `document` - The transformed document
    async fn upsert(
        &self,
        context_id: &str,
        id: &str,
        document: &DisqualifiedOfficerDocument,
    ) -> ApiOutcome;

    /// Delete the document stored under `id`.
    ///
    /// Deleting a document that does not exist is reported as `Success`.
    async fn remove(&self, context_id: &str, id: &str) -> ApiOutcome;
}
