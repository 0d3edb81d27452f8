//! Shared Kafka utilities for the disqualified officers search indexer.
//!
//! This crate provides the client configuration used by both the stream
//! consumer and the retry/quarantine producer, along with the header names and
//! header codecs carried by republished records.
//!
//! ## Usage
//!
//! ```ignore
//! use disqualified_search_kafka::{create_consumer, create_producer, KafkaClientSettings};
//!
//! let settings = KafkaClientSettings::new("localhost:9092", "disqualified-search-indexer");
//! let consumer = create_consumer(&settings, "disqualified-officer-search-consumer")?;
//! let producer = create_producer(&settings)?;
//! ```

pub mod headers;

use anyhow::Result;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::StreamConsumer;
use rdkafka::producer::FutureProducer;

pub use headers::{
    decode_attempt_count, decode_epoch_millis, encode_attempt_count, encode_epoch_millis,
    FAILURE_REASON_HEADER, ORIGINAL_TOPIC_HEADER, RETRY_COUNT_HEADER, RETRY_NOT_BEFORE_HEADER,
};

/// Connection settings shared by every Kafka client of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaClientSettings {
    /// Kafka broker address (e.g., "localhost:9092")
    pub broker: String,
    /// Client ID reported to the broker
    pub client_id: String,
    /// SASL username (enables SASL/SSL if set)
    pub username: Option<String>,
    /// SASL password (required if username is set)
    pub password: Option<String>,
    /// Custom CA certificate in PEM format
    pub ssl_ca_pem: Option<String>,
}

impl KafkaClientSettings {
    /// Create settings for a plaintext connection.
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            username: None,
            password: None,
            ssl_ca_pem: None,
        }
    }

    /// Set SASL credentials.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Set custom CA certificate.
    pub fn with_ssl_ca(mut self, ca_pem: String) -> Self {
        self.ssl_ca_pem = Some(ca_pem);
        self
    }

    /// Whether SASL/SSL is enabled.
    pub fn uses_sasl(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Base client configuration with broker address and security settings.
    fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();

        client_config
            .set("bootstrap.servers", &self.broker)
            .set("client.id", &self.client_id);

        // If SASL credentials are provided, enable SASL/SSL (for managed Kafka)
        // Otherwise, use plaintext (for local development)
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);

            if let Some(ca_pem) = &self.ssl_ca_pem {
                client_config.set("ssl.ca.pem", ca_pem);
            }
        }

        client_config
    }

    /// Client configuration for the stream consumer.
    ///
    /// Offsets are committed manually once a record has been resolved, so
    /// auto commit is disabled. New groups start from the earliest offset.
    pub fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut client_config = self.client_config();

        client_config
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("isolation.level", "read_committed")
            .set("session.timeout.ms", "6000");

        client_config
    }

    /// Client configuration for the retry and quarantine producer.
    pub fn producer_config(&self) -> ClientConfig {
        let mut client_config = self.client_config();

        client_config
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000")
            .set("acks", "all");

        client_config
    }
}

/// Create a stream consumer for the given consumer group.
pub fn create_consumer(settings: &KafkaClientSettings, group_id: &str) -> Result<StreamConsumer> {
    Ok(settings.consumer_config(group_id).create()?)
}

/// Create a producer that reports the delivery of each record.
pub fn create_producer(settings: &KafkaClientSettings) -> Result<FutureProducer> {
    Ok(settings.producer_config().create()?)
}

// Re-export commonly used rdkafka types for convenience
pub use rdkafka::message::{Header, Headers, OwnedHeaders};
pub use rdkafka::producer::FutureRecord;
