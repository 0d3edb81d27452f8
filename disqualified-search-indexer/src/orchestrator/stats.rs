//! Progress counters shared by the workers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::router::RetryDecision;

/// Running totals since startup.
#[derive(Debug, Default)]
pub struct PipelineStats {
    processed: AtomicU64,
    committed: AtomicU64,
    retried: AtomicU64,
    quarantined: AtomicU64,
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounts {
    /// Records run through the processor.
    pub processed: u64,
    /// Records acknowledged for commit.
    pub committed: u64,
    /// Records republished on a retry stage.
    pub retried: u64,
    /// Records republished on a terminal topic.
    pub quarantined: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a processed record and the decision taken for it.
    pub fn record_decision(&self, decision: &RetryDecision) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match decision {
            RetryDecision::Commit => {}
            RetryDecision::Retry { .. } => {
                self.retried.fetch_add(1, Ordering::Relaxed);
            }
            RetryDecision::Quarantine { .. } => {
                self.quarantined.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Count an acknowledged record.
    pub fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineCounts {
        PipelineCounts {
            processed: self.processed.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Sink;
    use std::time::Duration;

    #[test]
    fn test_counts_by_decision() {
        let stats = PipelineStats::new();
        stats.record_decision(&RetryDecision::Commit);
        stats.record_decision(&RetryDecision::Retry {
            next_topic: "stream-disqualifications-retry".to_string(),
            delay: Duration::from_secs(1),
            attempt: 1,
        });
        stats.record_decision(&RetryDecision::Quarantine {
            topic: "stream-disqualifications-invalid".to_string(),
            sink: Sink::Invalid,
            reason: "bad".to_string(),
        });
        stats.record_commit();

        assert_eq!(
            stats.snapshot(),
            PipelineCounts {
                processed: 3,
                committed: 1,
                retried: 1,
                quarantined: 1,
            }
        );
    }
}
