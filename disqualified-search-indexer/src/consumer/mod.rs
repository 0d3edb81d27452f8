//! Consumer module for the search indexer pipeline.
//!
//! Provides Kafka consumer functionality for receiving change envelopes.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{InboundRecord, RecordPosition, StreamMessage, TopicPartition};
