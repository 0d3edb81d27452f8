//! Error types for the search indexer pipeline.

use thiserror::Error;

/// Errors that stop the pipeline.
///
/// Per-message failures are never reported with this type; they resolve to a
/// [`ProcessingError`] and a routing decision instead.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A retry or quarantine record could not be published.
    #[error("Publish error: {0}")]
    PublishError(String),

    /// A worker task stopped unexpectedly.
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl IngestError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a publish error.
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::PublishError(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

/// Why a single record could not be applied to the search index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// The record body is not a valid change envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope describes a different kind of resource.
    #[error("Unexpected resource kind: expected {expected}, got {actual}")]
    UnexpectedResourceKind { expected: String, actual: String },

    /// The changed payload could not be transformed into a document.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The search API rejected the request (4xx).
    #[error("Search API rejected the request with status {status}")]
    ClientRejected { status: u16 },

    /// The search API failed to handle the request (5xx).
    #[error("Search API unavailable with status {status}")]
    ServerUnavailable { status: u16 },

    /// The search API could not be reached.
    #[error("Network failure: {0}")]
    NetworkFailure(String),
}

impl ProcessingError {
    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServerUnavailable { .. } | Self::NetworkFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_taxonomy() {
        assert!(ProcessingError::ServerUnavailable { status: 503 }.is_retryable());
        assert!(ProcessingError::NetworkFailure("timed out".to_string()).is_retryable());

        assert!(!ProcessingError::MalformedEnvelope("eof".to_string()).is_retryable());
        assert!(!ProcessingError::MalformedPayload("eof".to_string()).is_retryable());
        assert!(!ProcessingError::ClientRejected { status: 400 }.is_retryable());
        assert!(!ProcessingError::UnexpectedResourceKind {
            expected: "disqualified-officers".to_string(),
            actual: "company-profile".to_string(),
        }
        .is_retryable());
    }
}
