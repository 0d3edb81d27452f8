//! Orchestrator module for the search indexer pipeline.
//!
//! Coordinates the consumer, the worker pool and the offset commits.

mod backlog;
mod stats;
mod worker;

pub use stats::{PipelineCounts, PipelineStats};
pub use worker::worker_index;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{InboundRecord, StreamMessage};
use crate::errors::IngestError;
use crate::processor::ResourceChangedProcessor;
use crate::publisher::RecordPublisher;
use crate::router::RetryRouter;
use backlog::PartitionBacklog;
use worker::Worker;

/// Source of records for the orchestrator.
///
/// `run` sends records on `sender` and commits the position of every
/// acknowledgment received on `ack_receiver`. The same channel carries
/// `Pause` and `Resume` requests for partitions whose backlog is too long.
/// After `shutdown` fires it stops reading records but keeps committing
/// acknowledgments until the acknowledgment channel closes.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn subscribe(&self) -> Result<(), IngestError>;

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::UnboundedReceiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer, and the number of records a
    /// partition may have waiting in its worker before it is paused.
    pub channel_buffer_size: usize,
    /// Number of worker tasks.
    pub worker_count: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            worker_count: 4,
        }
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Subscribes the consumer and runs it in the background
/// - Assigns each partition to one worker so records are handled in order
/// - Never waits on a worker: a partition with a long backlog is paused instead
/// - Stops the pipeline when a record cannot be republished
/// - Handles shutdown signals and logs progress
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: Arc<ResourceChangedProcessor>,
    router: Arc<RetryRouter>,
    publisher: Arc<dyn RecordPublisher>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    stats: Arc<PipelineStats>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        processor: ResourceChangedProcessor,
        router: RetryRouter,
        publisher: Arc<dyn RecordPublisher>,
    ) -> Self {
        Self::with_config(
            consumer,
            processor,
            router,
            publisher,
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: ResourceChangedProcessor,
        router: RetryRouter,
        publisher: Arc<dyn RecordPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor: Arc::new(processor),
            router: Arc::new(router),
            publisher,
            config,
            shutdown_tx,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer stream ends, a shutdown signal is received or
    /// a record cannot be republished. In the last case the error is returned
    /// and the record's offset is not committed.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!(
            worker_count = self.config.worker_count,
            "Starting search indexer orchestrator"
        );

        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) = mpsc::unbounded_channel::<StreamMessage>();

        // Start consumer in background
        let consumer = self.consumer.clone();
        let consumer_shutdown = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, consumer_shutdown)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        // Start workers, each owning the acknowledgment sender it was given
        let worker_count = self.config.worker_count.max(1);
        let backlog = Arc::new(PartitionBacklog::new(self.config.channel_buffer_size));
        let mut workers = JoinSet::new();
        let mut worker_senders = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (record_tx, record_rx) = mpsc::unbounded_channel::<InboundRecord>();
            let worker = Worker {
                id,
                processor: Arc::clone(&self.processor),
                router: Arc::clone(&self.router),
                publisher: Arc::clone(&self.publisher),
                ack_sender: ack_transmitter.clone(),
                backlog: Arc::clone(&backlog),
                stats: Arc::clone(&self.stats),
            };
            workers.spawn(worker.run(record_rx, self.shutdown_tx.subscribe()));
            worker_senders.push(record_tx);
        }
        // Kept for pause requests; dropped before waiting for the consumer
        let control_sender = ack_transmitter;

        info!("Ready to process records from Kafka");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Track previous values for rate calculation
        let mut prev_processed: u64 = 0;
        let mut prev_time = std::time::Instant::now();
        let mut failure: Option<IngestError> = None;

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Record(record)) => {
                            let index = worker_index(&record.topic, record.partition, worker_count);
                            let partition = record.topic_partition();
                            let pause = backlog.dispatched(&partition);
                            if worker_senders[index].send(record).is_err() {
                                // The worker has stopped; its result is collected below
                                warn!(worker = index, "Worker queue closed");
                                let _ = self.shutdown_tx.send(());
                                break;
                            }
                            if pause {
                                info!(
                                    partition = %partition,
                                    pending = backlog.pending(&partition),
                                    worker = index,
                                    "Partition backlog full, pausing"
                                );
                                let _ = control_sender.send(StreamMessage::Pause(partition));
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment(_))
                        | Some(StreamMessage::Pause(_))
                        | Some(StreamMessage::Resume(_)) => {
                            warn!("Received control message on event channel (should be on ack channel)");
                        }
                    }
                }
                Some(joined) = workers.join_next() => {
                    match joined {
                        Ok(Ok(())) => warn!("Worker stopped"),
                        Ok(Err(e)) => {
                            error!(error = %e, "Worker failed, stopping pipeline");
                            failure = Some(e);
                        }
                        Err(e) => {
                            error!(error = %e, "Worker task panicked, stopping pipeline");
                            failure = Some(IngestError::worker(e.to_string()));
                        }
                    }
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let counts = self.stats.snapshot();

                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let records_per_sec = if elapsed_secs > 0.0 {
                        (counts.processed.saturating_sub(prev_processed) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        records_processed = counts.processed,
                        records_committed = counts.committed,
                        records_retried = counts.retried,
                        records_quarantined = counts.quarantined,
                        records_per_sec = format!("{:.2}", records_per_sec),
                        "Processing progress"
                    );

                    prev_processed = counts.processed;
                    prev_time = now;
                }
            }
        }

        // Let the workers finish their queues (or their current record after a
        // shutdown signal). Unacknowledged records are re-read on restart.
        drop(event_receiver);
        drop(worker_senders);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Worker failed during shutdown");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Worker task panicked during shutdown");
                    if failure.is_none() {
                        failure = Some(IngestError::worker(e.to_string()));
                    }
                }
            }
        }
        debug!("All workers stopped");
        drop(control_sender);

        // The consumer returns once every acknowledgment has been committed
        let _ = consumer_handle.await;

        let counts = self.stats.snapshot();
        info!(
            total_records_processed = counts.processed,
            total_records_committed = counts.committed,
            total_records_retried = counts.retried,
            total_records_quarantined = counts.quarantined,
            "Orchestrator shutdown complete"
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Totals since startup.
    pub fn stats(&self) -> PipelineCounts {
        self.stats.snapshot()
    }
}
