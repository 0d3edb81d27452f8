//! Worker tasks that process records in partition order.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::consumer::{InboundRecord, StreamMessage, TopicPartition};
use crate::errors::IngestError;
use crate::orchestrator::backlog::PartitionBacklog;
use crate::orchestrator::stats::PipelineStats;
use crate::processor::ResourceChangedProcessor;
use crate::publisher::RecordPublisher;
use crate::router::{RetryDecision, RetryRouter};

/// Index of the worker that owns a partition.
///
/// The mapping only depends on its arguments, so every record of a partition
/// is handled by the same worker.
pub fn worker_index(topic: &str, partition: i32, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    topic.hash(&mut hasher);
    partition.hash(&mut hasher);
    (hasher.finish() % worker_count.max(1) as u64) as usize
}

/// Time left until a record's not-before instant, if it is in the future.
fn remaining_delay(record: &InboundRecord) -> Option<Duration> {
    let not_before = record.not_before?;
    (not_before - Utc::now())
        .to_std()
        .ok()
        .filter(|wait| !wait.is_zero())
}

/// Records of a partition held back until `due`.
struct Lane {
    due: Instant,
    records: VecDeque<InboundRecord>,
}

/// Partitions whose head record is waiting for its retry delay.
///
/// Once a partition is parked, every later record of that partition queues
/// behind it. Records of other partitions are not affected.
#[derive(Default)]
pub(crate) struct PartitionLanes {
    lanes: HashMap<TopicPartition, Lane>,
}

impl PartitionLanes {
    /// Accept a record. Returns it if it can be handled right away.
    pub(crate) fn admit(&mut self, record: InboundRecord, now: Instant) -> Option<InboundRecord> {
        let partition = record.topic_partition();
        if let Some(lane) = self.lanes.get_mut(&partition) {
            lane.records.push_back(record);
            return None;
        }

        match remaining_delay(&record) {
            Some(wait) => {
                debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    wait_ms = wait.as_millis() as u64,
                    "Holding partition for retry delay"
                );
                self.lanes.insert(
                    partition,
                    Lane {
                        due: now + wait,
                        records: VecDeque::from([record]),
                    },
                );
                None
            }
            None => Some(record),
        }
    }

    /// Take the next record of a partition whose delay has passed.
    pub(crate) fn next_ready(&mut self, now: Instant) -> Option<InboundRecord> {
        let partition = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.due <= now)
            .min_by_key(|(_, lane)| lane.due)
            .map(|(partition, _)| partition.clone())?;

        let lane = self.lanes.get_mut(&partition)?;
        let record = lane.records.pop_front();
        match lane.records.front().map(remaining_delay) {
            None => {
                self.lanes.remove(&partition);
            }
            Some(Some(wait)) => lane.due = now + wait,
            Some(None) => {}
        }
        record
    }

    /// Earliest instant at which a parked partition becomes ready.
    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.lanes.values().map(|lane| lane.due).min()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Processes the records of the partitions assigned to it, one at a time.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) processor: Arc<ResourceChangedProcessor>,
    pub(crate) router: Arc<RetryRouter>,
    pub(crate) publisher: Arc<dyn RecordPublisher>,
    pub(crate) ack_sender: mpsc::UnboundedSender<StreamMessage>,
    pub(crate) backlog: Arc<PartitionBacklog>,
    pub(crate) stats: Arc<PipelineStats>,
}

impl Worker {
    /// Handle records until the channel closes and every held partition has
    /// been handled, or until shutdown is signalled.
    ///
    /// A record waiting for its retry delay only holds back its own partition.
    /// A record that is in progress when shutdown is signalled is finished;
    /// records still queued or held are left unacknowledged.
    pub(crate) async fn run(
        self,
        mut records: mpsc::UnboundedReceiver<InboundRecord>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        debug!(worker = self.id, "Worker started");

        let mut lanes = PartitionLanes::default();
        let mut closed = false;

        'outer: loop {
            while let Some(record) = lanes.next_ready(Instant::now()) {
                if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
                    break 'outer;
                }
                self.handle(record).await?;
            }

            if closed && lanes.is_empty() {
                break;
            }

            let next_due = lanes.next_due();
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                record = records.recv(), if !closed => match record {
                    Some(record) => {
                        if let Some(record) = lanes.admit(record, Instant::now()) {
                            self.handle(record).await?;
                        }
                    }
                    None => closed = true,
                },
                _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {}
            }
        }

        debug!(worker = self.id, "Worker stopped");
        Ok(())
    }

    /// Process, route and acknowledge a single record.
    async fn handle(&self, record: InboundRecord) -> Result<(), IngestError> {
        let handling = self.processor.process(&record).await;
        let decision = self.router.route(&record, &handling);

        if let Some(outbound) = self.router.outbound(&record, &decision, Utc::now()) {
            self.publisher.publish(&outbound).await?;
        }

        match &decision {
            RetryDecision::Commit => {}
            RetryDecision::Retry {
                next_topic,
                delay,
                attempt,
            } => info!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                next_topic = %next_topic,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Scheduled record for retry"
            ),
            RetryDecision::Quarantine {
                topic,
                sink,
                reason,
            } => warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                quarantine_topic = %topic,
                sink = %sink,
                reason = %reason,
                "Quarantined record"
            ),
        }
        self.stats.record_decision(&decision);

        self.ack_sender
            .send(StreamMessage::Acknowledgment(record.position()))
            .map_err(|e| IngestError::channel(e.to_string()))?;
        self.stats.record_commit();

        let partition = record.topic_partition();
        if self.backlog.finished(&partition) {
            self.ack_sender
                .send(StreamMessage::Resume(partition))
                .map_err(|e| IngestError::channel(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str, partition: i32, offset: i64) -> InboundRecord {
        InboundRecord::new(topic, partition, offset, b"{}".to_vec())
    }

    fn delayed(topic: &str, partition: i32, offset: i64, millis: i64) -> InboundRecord {
        record(topic, partition, offset)
            .with_not_before(Utc::now() + chrono::Duration::milliseconds(millis))
    }

    #[test]
    fn test_worker_index_is_stable() {
        for partition in 0..16 {
            let first = worker_index("stream-disqualifications", partition, 4);
            let second = worker_index("stream-disqualifications", partition, 4);
            assert_eq!(first, second);
            assert!(first < 4);
        }
    }

    #[test]
    fn test_single_worker_owns_everything() {
        assert_eq!(worker_index("stream-disqualifications", 7, 1), 0);
        assert_eq!(worker_index("stream-disqualifications-retry", 3, 0), 0);
    }

    #[test]
    fn test_due_record_passes_through() {
        let mut lanes = PartitionLanes::default();
        let now = Instant::now();

        let passed = lanes.admit(record("stream-disqualifications", 0, 1), now);
        assert_eq!(passed.map(|r| r.offset), Some(1));

        let past = record("stream-disqualifications-retry", 0, 2)
            .with_not_before(Utc::now() - chrono::Duration::seconds(5));
        assert_eq!(lanes.admit(past, now).map(|r| r.offset), Some(2));
        assert!(lanes.is_empty());
    }

    #[test]
    fn test_delayed_record_holds_only_its_partition() {
        let mut lanes = PartitionLanes::default();
        let now = Instant::now();

        assert!(lanes
            .admit(delayed("stream-disqualifications-retry", 0, 10, 60_000), now)
            .is_none());
        // Later records of the held partition queue behind it
        assert!(lanes
            .admit(record("stream-disqualifications-retry", 0, 11), now)
            .is_none());
        // Other partitions are handled right away
        assert_eq!(
            lanes
                .admit(record("stream-disqualifications", 0, 3), now)
                .map(|r| r.offset),
            Some(3)
        );

        assert!(lanes.next_ready(now).is_none());
        let due = lanes.next_due().unwrap();
        assert!(due > now + Duration::from_secs(59));

        assert_eq!(lanes.next_ready(due).map(|r| r.offset), Some(10));
        assert_eq!(lanes.next_ready(due).map(|r| r.offset), Some(11));
        assert!(lanes.next_ready(due).is_none());
        assert!(lanes.is_empty());
    }

    #[test]
    fn test_queued_delayed_record_starts_a_new_wait() {
        let mut lanes = PartitionLanes::default();
        let now = Instant::now();

        lanes.admit(delayed("stream-disqualifications-retry", 1, 1, 1_000), now);
        lanes.admit(delayed("stream-disqualifications-retry", 1, 2, 60_000), now);

        let due = lanes.next_due().unwrap();
        assert_eq!(lanes.next_ready(due).map(|r| r.offset), Some(1));

        // The next record still waits for its own not-before instant
        assert!(lanes.next_ready(due).is_none());
        assert!(lanes.next_due().unwrap() > due + Duration::from_secs(30));
        assert!(!lanes.is_empty());
    }
}
