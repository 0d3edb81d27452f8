//! Kafka consumer implementation for the search indexer.
//!
//! Consumes change envelopes from the stream topic and its retry topics and
//! forwards them to the pipeline. Offsets are committed only when a worker
//! acknowledges the record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::{
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::{InboundRecord, RecordPosition, StreamMessage, TopicPartition};
use crate::errors::IngestError;
use crate::orchestrator::Consumer;
use disqualified_search_kafka::{
    create_consumer, decode_attempt_count, decode_epoch_millis, Headers, KafkaClientSettings,
    RETRY_COUNT_HEADER, RETRY_NOT_BEFORE_HEADER,
};

/// Kafka consumer for change envelopes.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `settings` - Broker address and credentials
    /// * `group_id` - Consumer group ID
    /// * `topics` - Topics to subscribe to (the stream topic and its retry topics)
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(
        settings: &KafkaClientSettings,
        group_id: &str,
        topics: Vec<String>,
    ) -> Result<Self, IngestError> {
        let consumer =
            create_consumer(settings, group_id).map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %settings.broker,
            group_id = %group_id,
            sasl = settings.uses_sasl(),
            "Created Kafka consumer"
        );

        Ok(Self { consumer, topics })
    }

    /// Commit the offset following an acknowledged record.
    fn commit(&self, position: &RecordPosition) -> Result<(), IngestError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &position.topic,
            position.partition,
            Offset::Offset(position.offset + 1),
        )?;

        self.consumer.commit(&tpl, CommitMode::Async)?;

        Ok(())
    }

    /// Pause or resume fetching from a partition.
    fn set_paused(&self, partition: &TopicPartition, paused: bool) -> Result<(), IngestError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition(&partition.topic, partition.partition);

        if paused {
            self.consumer.pause(&tpl)?;
        } else {
            self.consumer.resume(&tpl)?;
        }

        Ok(())
    }

    /// Copy a Kafka message into an owned record.
    fn to_record(msg: &BorrowedMessage<'_>) -> InboundRecord {
        let headers = msg
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|header| (header.key, header.value))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let (attempt_count, not_before) = decode_retry_headers(headers);

        InboundRecord {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec),
            payload: msg.payload().map(<[u8]>::to_vec),
            attempt_count,
            not_before,
        }
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Start consuming records and send them through the channel.
    ///
    /// After a shutdown signal no further records are read, but
    /// acknowledgments keep being committed until every worker has dropped
    /// its acknowledgment sender.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::UnboundedReceiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut draining = false;

        loop {
            tokio::select! {
                _ = shutdown.recv(), if !draining => {
                    info!("Consumer received shutdown signal");
                    // Unacknowledged records are re-read from the last committed offset on restart
                    let _ = sender.send(StreamMessage::End).await;
                    draining = true;
                }
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment(position)) => {
                            match self.commit(&position) {
                                Ok(()) => debug!(
                                    topic = %position.topic,
                                    partition = position.partition,
                                    offset = position.offset,
                                    "Committed offset after acknowledgment"
                                ),
                                Err(e) => error!(error = %e, "Failed to commit offset after acknowledgment"),
                            }
                        }
                        Some(StreamMessage::Pause(partition)) => {
                            match self.set_paused(&partition, true) {
                                Ok(()) => info!(partition = %partition, "Paused partition until its backlog drains"),
                                // A revoked partition is no longer fetched anyway
                                Err(e) => warn!(partition = %partition, error = %e, "Failed to pause partition"),
                            }
                        }
                        Some(StreamMessage::Resume(partition)) => {
                            match self.set_paused(&partition, false) {
                                Ok(()) => info!(partition = %partition, "Resumed partition"),
                                Err(e) => warn!(partition = %partition, error = %e, "Failed to resume partition"),
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        Some(_) => {
                            // Ignore other message types
                        }
                    }
                }
                message = message_stream.next(), if !draining => {
                    match message.map(|result| result.map(|msg| Self::to_record(&msg))) {
                        Some(Ok(record)) => {
                            debug!(
                                topic = %record.topic,
                                partition = record.partition,
                                offset = record.offset,
                                attempt = record.attempt_count,
                                "Received message from Kafka"
                            );
                            if sender.send(StreamMessage::Record(record)).await.is_err() {
                                warn!("Record channel closed, draining acknowledgments");
                                draining = true;
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            let _ = sender.send(StreamMessage::End).await;
                            draining = true;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Read the attempt count and not-before instant from record headers.
///
/// A missing or unreadable attempt count is treated as 0.
fn decode_retry_headers<'a>(
    headers: impl IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
) -> (u32, Option<DateTime<Utc>>) {
    let mut attempt_count = 0;
    let mut not_before = None;

    for (key, value) in headers {
        let Some(value) = value else { continue };
        match key {
            RETRY_COUNT_HEADER => match decode_attempt_count(value) {
                Some(count) => attempt_count = count,
                None => warn!(header = %key, "Ignoring unreadable retry count header"),
            },
            RETRY_NOT_BEFORE_HEADER => {
                not_before = decode_epoch_millis(value).and_then(DateTime::from_timestamp_millis);
                if not_before.is_none() {
                    warn!(header = %key, "Ignoring unreadable retry not-before header");
                }
            }
            _ => {}
        }
    }

    (attempt_count, not_before)
}
