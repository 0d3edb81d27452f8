//! Message types for the consumer.
//!
//! Defines the records and control messages that flow through the pipeline.

use chrono::{DateTime, Utc};

/// A record read from one of the subscribed topics.
///
/// The key and body are kept as raw bytes so that a retried record can be
/// republished byte for byte. Only the headers are decoded here.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRecord {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition the record was read from.
    pub partition: i32,
    /// Offset of the record within its partition.
    pub offset: i64,
    /// Record key.
    pub key: Option<Vec<u8>>,
    /// Record body (the JSON change envelope).
    pub payload: Option<Vec<u8>>,
    /// Retry stages already completed (0 for a record from the main topic).
    pub attempt_count: u32,
    /// Earliest instant at which the record may be processed.
    pub not_before: Option<DateTime<Utc>>,
}

impl InboundRecord {
    /// Create a first-attempt record.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: Some(payload),
            attempt_count: 0,
            not_before: None,
        }
    }

    /// Set the record key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the attempt count.
    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    /// Set the earliest processing instant.
    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// The position of this record, used to acknowledge it.
    pub fn position(&self) -> RecordPosition {
        RecordPosition {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
        }
    }

    /// The partition this record was read from.
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition {
            topic: self.topic.clone(),
            partition: self.partition,
        }
    }
}

/// A partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl std::fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.topic, self.partition)
    }
}

/// Topic, partition and offset of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Messages that flow through the pipeline.
#[derive(Debug)]
pub enum StreamMessage {
    /// A record to process.
    Record(InboundRecord),
    /// The record at this position has been resolved and may be committed.
    Acknowledgment(RecordPosition),
    /// Stop fetching from a partition until it is resumed.
    Pause(TopicPartition),
    /// Fetch from a paused partition again.
    Resume(TopicPartition),
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
