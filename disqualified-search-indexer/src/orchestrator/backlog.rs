//! Per-partition backlog of dispatched records.
//!
//! A partition is paused once `limit` of its records are waiting in a worker
//! and resumed when half of them have been handled.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::consumer::TopicPartition;

#[derive(Debug, Default)]
struct PartitionState {
    pending: usize,
    paused: bool,
}

#[derive(Debug)]
pub(crate) struct PartitionBacklog {
    limit: usize,
    partitions: Mutex<HashMap<TopicPartition, PartitionState>>,
}

impl PartitionBacklog {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            partitions: Mutex::new(HashMap::new()),
        }
    }

    /// Count a record handed to a worker. Returns `true` when the partition
    /// should be paused.
    pub(crate) fn dispatched(&self, partition: &TopicPartition) -> bool {
        let mut partitions = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        let state = partitions.entry(partition.clone()).or_default();
        state.pending += 1;

        if !state.paused && state.pending >= self.limit {
            state.paused = true;
            return true;
        }
        false
    }

    /// Count a handled record. Returns `true` when the partition should be
    /// resumed.
    pub(crate) fn finished(&self, partition: &TopicPartition) -> bool {
        let mut partitions = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = partitions.get_mut(partition) else {
            return false;
        };
        state.pending = state.pending.saturating_sub(1);

        let resume = state.paused && state.pending <= self.limit / 2;
        if resume {
            state.paused = false;
        }
        if state.pending == 0 && !state.paused {
            partitions.remove(partition);
        }
        resume
    }

    /// Records of `partition` dispatched but not yet handled.
    pub(crate) fn pending(&self, partition: &TopicPartition) -> usize {
        self.partitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(partition)
            .map_or(0, |state| state.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(number: i32) -> TopicPartition {
        TopicPartition {
            topic: "stream-disqualifications-retry".to_string(),
            partition: number,
        }
    }

    #[test]
    fn test_pause_at_limit_and_resume_at_half() {
        let backlog = PartitionBacklog::new(4);
        let p0 = partition(0);

        assert!(!backlog.dispatched(&p0));
        assert!(!backlog.dispatched(&p0));
        assert!(!backlog.dispatched(&p0));
        assert!(backlog.dispatched(&p0));
        // Already paused
        assert!(!backlog.dispatched(&p0));
        assert_eq!(backlog.pending(&p0), 5);

        assert!(!backlog.finished(&p0));
        assert!(!backlog.finished(&p0));
        assert!(backlog.finished(&p0));
        assert!(!backlog.finished(&p0));
        assert!(!backlog.finished(&p0));
        assert_eq!(backlog.pending(&p0), 0);
    }

    #[test]
    fn test_partitions_are_tracked_separately() {
        let backlog = PartitionBacklog::new(2);

        assert!(!backlog.dispatched(&partition(0)));
        assert!(!backlog.dispatched(&partition(1)));
        assert!(backlog.dispatched(&partition(0)));

        assert_eq!(backlog.pending(&partition(0)), 2);
        assert_eq!(backlog.pending(&partition(1)), 1);
    }

    #[test]
    fn test_finished_without_dispatch_is_ignored() {
        let backlog = PartitionBacklog::new(2);
        assert!(!backlog.finished(&partition(3)));
        assert_eq!(backlog.pending(&partition(3)), 0);
    }
}
