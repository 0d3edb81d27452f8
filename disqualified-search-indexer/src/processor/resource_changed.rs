//! Per-record handling of resource-changed envelopes.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::consumer::InboundRecord;
use crate::errors::ProcessingError;
use crate::processor::classifier::{classify, Handling};
use crate::processor::transformer::{DocumentTransformer, TransformError};
use disqualified_search_repository::SearchApiClient;
use disqualified_search_shared::{ChangeEnvelope, EventKind};

/// Decodes a record, applies it to the search index and classifies the result.
///
/// The processor holds no per-record state and is shared by all workers.
pub struct ResourceChangedProcessor {
    transformer: Arc<dyn DocumentTransformer>,
    client: Arc<dyn SearchApiClient>,
    expected_kind: String,
}

impl ResourceChangedProcessor {
    /// Create a processor accepting envelopes of `expected_kind`.
    pub fn new(
        transformer: Arc<dyn DocumentTransformer>,
        client: Arc<dyn SearchApiClient>,
        expected_kind: impl Into<String>,
    ) -> Self {
        Self {
            transformer,
            client,
            expected_kind: expected_kind.into(),
        }
    }

    /// Decode and validate the envelope carried by a record.
    pub fn decode(&self, record: &InboundRecord) -> Result<ChangeEnvelope, ProcessingError> {
        let body = record
            .payload
            .as_deref()
            .ok_or_else(|| ProcessingError::MalformedEnvelope("record has no body".to_string()))?;

        let envelope: ChangeEnvelope = serde_json::from_slice(body)
            .map_err(|e| ProcessingError::MalformedEnvelope(e.to_string()))?;

        if envelope.resource_id.trim().is_empty() {
            return Err(ProcessingError::MalformedEnvelope(
                "resource_id is empty".to_string(),
            ));
        }

        if envelope.resource_kind != self.expected_kind {
            return Err(ProcessingError::UnexpectedResourceKind {
                expected: self.expected_kind.clone(),
                actual: envelope.resource_kind,
            });
        }

        Ok(envelope.with_attempt_count(record.attempt_count))
    }

    /// Process a single record.
    ///
    /// At most one search API call is made. Failures never escape; they are
    /// reported through the returned [`Handling`].
    #[instrument(
        skip(self, record),
        fields(topic = %record.topic, partition = record.partition, offset = record.offset)
    )]
    pub async fn process(&self, record: &InboundRecord) -> Handling {
        let envelope = match self.decode(record) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Rejecting undecodable record");
                return Handling::NonRetryable(e);
            }
        };

        let context_id = envelope.context_id.as_str();
        let resource_id = envelope.resource_id.as_str();

        let outcome = match envelope.event_kind() {
            EventKind::Changed => {
                let payload = match envelope.payload() {
                    Some(payload) => payload,
                    None => {
                        warn!(context_id = %context_id, resource_id = %resource_id, "Changed event without payload");
                        return Handling::NonRetryable(ProcessingError::MalformedPayload(
                            "changed event has no data".to_string(),
                        ));
                    }
                };

                let document = match self.transformer.transform(&envelope, payload) {
                    Ok(document) => document,
                    Err(TransformError::MalformedPayload(reason)) => {
                        warn!(
                            context_id = %context_id,
                            resource_id = %resource_id,
                            reason = %reason,
                            "Failed to transform payload"
                        );
                        return Handling::NonRetryable(ProcessingError::MalformedPayload(reason));
                    }
                };

                self.client.upsert(context_id, resource_id, &document).await
            }
            EventKind::Deleted => self.client.remove(context_id, resource_id).await,
        };

        let handling = classify(&outcome);
        match &handling {
            Handling::Success => info!(
                context_id = %context_id,
                resource_id = %resource_id,
                event = %envelope.event_kind(),
                attempt = envelope.attempt_count,
                "Applied change to search index"
            ),
            Handling::Retryable(e) | Handling::NonRetryable(e) => debug!(
                context_id = %context_id,
                resource_id = %resource_id,
                event = %envelope.event_kind(),
                attempt = envelope.attempt_count,
                status = ?outcome.status(),
                error = %e,
                "Search API call failed"
            ),
        }
        handling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use disqualified_search_repository::{ApiOutcome, SearchApiError};
    use disqualified_search_shared::{DisqualifiedOfficerDocument, DocumentLinks, DOCUMENT_KIND};
    use crate::processor::DisqualificationTransformer;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const KIND: &str = "disqualified-officers";

    struct StubTransformer {
        calls: Mutex<usize>,
        fail: bool,
    }

    impl StubTransformer {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl DocumentTransformer for StubTransformer {
        fn transform(
            &self,
            envelope: &ChangeEnvelope,
            _payload: &str,
        ) -> Result<DisqualifiedOfficerDocument, TransformError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(TransformError::malformed("bad payload"));
            }
            Ok(DisqualifiedOfficerDocument {
                kind: DOCUMENT_KIND.to_string(),
                items: Vec::new(),
                links: DocumentLinks {
                    self_link: envelope.resource_uri.clone(),
                },
                sort_key: envelope.resource_id.clone(),
            })
        }
    }

    struct StubClient {
        outcome: ApiOutcome,
        upserts: Mutex<Vec<(String, String)>>,
        removes: Mutex<Vec<(String, String)>>,
    }

    impl StubClient {
        fn new(outcome: ApiOutcome) -> Self {
            Self {
                outcome,
                upserts: Mutex::new(Vec::new()),
                removes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchApiClient for StubClient {
        async fn ensure_index_exists(&self) -> Result<(), SearchApiError> {
            Ok(())
        }

        async fn upsert(
            &self,
            context_id: &str,
            id: &str,
            _document: &DisqualifiedOfficerDocument,
        ) -> ApiOutcome {
            self.upserts
                .lock()
                .unwrap()
                .push((context_id.to_string(), id.to_string()));
            self.outcome.clone()
        }

        async fn remove(&self, context_id: &str, id: &str) -> ApiOutcome {
            self.removes
                .lock()
                .unwrap()
                .push((context_id.to_string(), id.to_string()));
            self.outcome.clone()
        }
    }

    fn record(event: &str, resource_id: &str, resource_kind: &str, data: Option<&str>) -> InboundRecord {
        let mut envelope = serde_json::json!({
            "context_id": "context_id",
            "resource_id": resource_id,
            "resource_kind": resource_kind,
            "resource_uri": format!("/disqualified-officers/natural/{}", resource_id),
            "event": { "type": event, "published_at": "2022010351" }
        });
        if let Some(data) = data {
            envelope["data"] = serde_json::Value::String(data.to_string());
        }
        InboundRecord::new(
            "stream-disqualifications",
            0,
            7,
            serde_json::to_vec(&envelope).unwrap(),
        )
    }

    fn processor(
        outcome: ApiOutcome,
        fail_transform: bool,
    ) -> (ResourceChangedProcessor, Arc<StubTransformer>, Arc<StubClient>) {
        let transformer = Arc::new(StubTransformer::new(fail_transform));
        let client = Arc::new(StubClient::new(outcome));
        let processor = ResourceChangedProcessor::new(transformer.clone(), client.clone(), KIND);
        (processor, transformer, client)
    }

    #[tokio::test]
    async fn test_changed_record_is_upserted() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, false);

        let handling = processor
            .process(&record("changed", "123456789", KIND, Some("{}")))
            .await;

        assert_eq!(handling, Handling::Success);
        assert_eq!(transformer.calls(), 1);
        assert_eq!(
            *client.upserts.lock().unwrap(),
            vec![("context_id".to_string(), "123456789".to_string())]
        );
        assert!(client.removes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_record_skips_transformer() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, false);

        let handling = processor.process(&record("deleted", "42", KIND, None)).await;

        assert_eq!(handling, Handling::Success);
        assert_eq!(transformer.calls(), 0);
        assert_eq!(
            *client.removes.lock().unwrap(),
            vec![("context_id".to_string(), "42".to_string())]
        );
    }

    #[tokio::test]
    async fn test_deleted_record_follows_api_outcome() {
        let (processor, _, _) = processor(ApiOutcome::ServerError { status: 502 }, false);

        let handling = processor.process(&record("deleted", "42", KIND, None)).await;

        assert_eq!(
            handling,
            Handling::Retryable(ProcessingError::ServerUnavailable { status: 502 })
        );
    }

    #[tokio::test]
    async fn test_unexpected_kind_touches_nothing() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, false);

        let handling = processor
            .process(&record("changed", "123", "company-profile", Some("{}")))
            .await;

        assert_eq!(
            handling,
            Handling::NonRetryable(ProcessingError::UnexpectedResourceKind {
                expected: KIND.to_string(),
                actual: "company-profile".to_string(),
            })
        );
        assert_eq!(transformer.calls(), 0);
        assert!(client.upserts.lock().unwrap().is_empty());
        assert!(client.removes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_envelope() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, false);

        let handling = processor
            .process(&InboundRecord::new("stream-disqualifications", 0, 1, b"not json".to_vec()))
            .await;

        assert!(matches!(
            handling,
            Handling::NonRetryable(ProcessingError::MalformedEnvelope(_))
        ));
        assert_eq!(transformer.calls(), 0);
        assert!(client.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_malformed() {
        let (processor, _, client) = processor(ApiOutcome::Success, false);

        let handling = processor
            .process(&record("archived", "123", KIND, Some("{}")))
            .await;

        assert!(matches!(
            handling,
            Handling::NonRetryable(ProcessingError::MalformedEnvelope(_))
        ));
        assert!(client.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_resource_id_is_malformed() {
        let (processor, _, _) = processor(ApiOutcome::Success, false);

        let handling = processor.process(&record("deleted", "", KIND, None)).await;

        assert_eq!(
            handling,
            Handling::NonRetryable(ProcessingError::MalformedEnvelope(
                "resource_id is empty".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_changed_without_payload() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, false);

        let handling = processor.process(&record("changed", "123", KIND, Some("  "))).await;

        assert!(matches!(
            handling,
            Handling::NonRetryable(ProcessingError::MalformedPayload(_))
        ));
        assert_eq!(transformer.calls(), 0);
        assert!(client.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transform_failure_skips_api_call() {
        let (processor, transformer, client) = processor(ApiOutcome::Success, true);

        let handling = processor
            .process(&record("changed", "123", KIND, Some("{}")))
            .await;

        assert_eq!(
            handling,
            Handling::NonRetryable(ProcessingError::MalformedPayload("bad payload".to_string()))
        );
        assert_eq!(transformer.calls(), 1);
        assert!(client.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_rejection_is_not_retryable() {
        let (processor, _, _) = processor(ApiOutcome::ClientError { status: 400 }, false);

        let handling = processor
            .process(&record("changed", "123", KIND, Some("{}")))
            .await;

        assert_eq!(
            handling,
            Handling::NonRetryable(ProcessingError::ClientRejected { status: 400 })
        );
    }

    /// Search index held in memory, keyed by document id.
    #[derive(Default)]
    struct InMemoryIndex {
        documents: Mutex<HashMap<String, DisqualifiedOfficerDocument>>,
    }

    #[async_trait]
    impl SearchApiClient for InMemoryIndex {
        async fn ensure_index_exists(&self) -> Result<(), SearchApiError> {
            Ok(())
        }

        async fn upsert(
            &self,
            _context_id: &str,
            id: &str,
            document: &DisqualifiedOfficerDocument,
        ) -> ApiOutcome {
            self.documents
                .lock()
                .unwrap()
                .insert(id.to_string(), document.clone());
            ApiOutcome::Success
        }

        async fn remove(&self, _context_id: &str, id: &str) -> ApiOutcome {
            self.documents.lock().unwrap().remove(id);
            ApiOutcome::Success
        }
    }

    const OFFICER_PAYLOAD: &str = r#"{
        "forename": "John",
        "surname": "SMITH",
        "disqualifications": [{ "case_identifier": "INV1234", "disqualified_from": "2017-06-01" }],
        "links": { "self": "/disqualified-officers/natural/123456789" }
    }"#;

    fn index_processor() -> (ResourceChangedProcessor, Arc<InMemoryIndex>) {
        let index = Arc::new(InMemoryIndex::default());
        let processor = ResourceChangedProcessor::new(
            Arc::new(DisqualificationTransformer::new()),
            index.clone(),
            KIND,
        );
        (processor, index)
    }

    #[tokio::test]
    async fn test_repeated_upsert_leaves_index_unchanged() {
        let (processor, index) = index_processor();
        let changed = record("changed", "123456789", KIND, Some(OFFICER_PAYLOAD));

        assert_eq!(processor.process(&changed).await, Handling::Success);
        let after_first = index.documents.lock().unwrap().clone();

        assert_eq!(processor.process(&changed).await, Handling::Success);
        let after_second = index.documents.lock().unwrap().clone();

        assert_eq!(after_first.len(), 1);
        assert!(after_first.contains_key("123456789"));
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_repeated_remove_leaves_index_unchanged() {
        let (processor, index) = index_processor();
        processor
            .process(&record("changed", "123456789", KIND, Some(OFFICER_PAYLOAD)))
            .await;
        processor
            .process(&record("changed", "42", KIND, Some(OFFICER_PAYLOAD)))
            .await;

        let deleted = record("deleted", "42", KIND, None);
        assert_eq!(processor.process(&deleted).await, Handling::Success);
        let after_first = index.documents.lock().unwrap().clone();

        assert_eq!(processor.process(&deleted).await, Handling::Success);
        let after_second = index.documents.lock().unwrap().clone();

        assert_eq!(after_first.len(), 1);
        assert!(after_first.contains_key("123456789"));
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_decode_attaches_attempt_count() {
        let (processor, _, _) = processor(ApiOutcome::Success, false);
        let record = record("deleted", "42", KIND, None).with_attempt_count(2);

        let envelope = processor.decode(&record).unwrap();

        assert_eq!(envelope.attempt_count, 2);
        assert_eq!(envelope.resource_id, "42");
    }
}
