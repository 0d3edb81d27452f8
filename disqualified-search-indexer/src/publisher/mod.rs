//! Publisher module for retry and quarantine records.

mod kafka_publisher;

pub use kafka_publisher::{KafkaPublisher, DEFAULT_PUBLISH_MAX_ATTEMPTS};

use async_trait::async_trait;

use crate::consumer::InboundRecord;
use crate::errors::IngestError;

/// A record to publish on a retry or terminal topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<(String, Vec<u8>)>,
}

impl OutboundRecord {
    /// Copy the key and body of `record` for publication on `topic`.
    pub fn from_inbound(topic: impl Into<String>, record: &InboundRecord) -> Self {
        Self {
            topic: topic.into(),
            key: record.key.clone(),
            payload: record.payload.clone(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: Vec<u8>) -> Self {
        self.headers.push((name.to_string(), value));
        self
    }

    /// Value of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_slice())
    }
}

/// Publishes records and waits for the broker to acknowledge them.
///
/// An `Err` means the record is not known to be stored; the pipeline stops
/// without committing the source offset.
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    async fn publish(&self, record: &OutboundRecord) -> Result<(), IngestError>;
}
