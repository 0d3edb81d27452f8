//! Kafka implementation of the record publisher.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::producer::FutureProducer;
use rdkafka::util::Timeout;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{debug, info, warn};

use crate::errors::IngestError;
use crate::publisher::{OutboundRecord, RecordPublisher};
use disqualified_search_kafka::{create_producer, FutureRecord, Header, KafkaClientSettings, OwnedHeaders};

/// Default number of delivery attempts per record.
pub const DEFAULT_PUBLISH_MAX_ATTEMPTS: usize = 5;

/// How long a record may wait in the producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes retry and quarantine records with a Kafka producer.
pub struct KafkaPublisher {
    producer: FutureProducer,
    max_attempts: usize,
}

impl KafkaPublisher {
    /// Create a new publisher.
    ///
    /// # Arguments
    ///
    /// * `settings` - Broker address and credentials
    /// * `max_attempts` - Delivery attempts per record before giving up
    pub fn new(settings: &KafkaClientSettings, max_attempts: usize) -> Result<Self, IngestError> {
        let producer = create_producer(settings).map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %settings.broker,
            max_attempts = max_attempts,
            "Created Kafka publisher"
        );

        Ok(Self {
            producer,
            max_attempts: max_attempts.max(1),
        })
    }

    /// Send a record once and wait for its delivery report.
    async fn send_once(&self, record: &OutboundRecord) -> Result<(), IngestError> {
        let mut headers = OwnedHeaders::new_with_capacity(record.headers.len());
        for (name, value) in &record.headers {
            headers = headers.insert(Header {
                key: name.as_str(),
                value: Some(value),
            });
        }

        let mut future_record: FutureRecord<'_, Vec<u8>, Vec<u8>> =
            FutureRecord::to(&record.topic).headers(headers);
        if let Some(key) = &record.key {
            future_record = future_record.key(key);
        }
        if let Some(payload) = &record.payload {
            future_record = future_record.payload(payload);
        }

        match self
            .producer
            .send(future_record, Timeout::After(QUEUE_TIMEOUT))
            .await
        {
            Ok((partition, offset)) => {
                debug!(
                    topic = %record.topic,
                    partition = partition,
                    offset = offset,
                    "Published record"
                );
                Ok(())
            }
            Err((e, _)) => {
                warn!(topic = %record.topic, error = %e, "Failed to publish record");
                Err(IngestError::publish(format!(
                    "Failed to publish to {}: {}",
                    record.topic, e
                )))
            }
        }
    }
}

#[async_trait]
impl RecordPublisher for KafkaPublisher {
    async fn publish(&self, record: &OutboundRecord) -> Result<(), IngestError> {
        let retry = ExponentialBackoff::from_millis(10)
            .factor(10)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_attempts - 1);

        Retry::spawn(retry, || self.send_once(record)).await
    }
}
