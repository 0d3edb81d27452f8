//! Routing of processed records to their next destination.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::consumer::InboundRecord;
use crate::processor::Handling;
use crate::publisher::OutboundRecord;
use crate::router::topology::RetryTopology;
use disqualified_search_kafka::{
    encode_attempt_count, encode_epoch_millis, FAILURE_REASON_HEADER, ORIGINAL_TOPIC_HEADER,
    RETRY_COUNT_HEADER, RETRY_NOT_BEFORE_HEADER,
};

/// Terminal topic a record can be quarantined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// The record can never be applied.
    Invalid,
    /// The record kept failing after every retry stage.
    Error,
}

impl std::fmt::Display for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What happens to a record once it has been processed.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// The record is done; commit its offset.
    Commit,
    /// Republish the record on the next retry stage.
    Retry {
        next_topic: String,
        delay: Duration,
        attempt: u32,
    },
    /// Republish the record on a terminal topic.
    Quarantine {
        topic: String,
        sink: Sink,
        reason: String,
    },
}

/// Decides where a processed record goes next.
#[derive(Debug, Clone)]
pub struct RetryRouter {
    topology: RetryTopology,
}

impl RetryRouter {
    pub fn new(topology: RetryTopology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &RetryTopology {
        &self.topology
    }

    /// Decide the destination of a record from its handling.
    ///
    /// A retryable failure moves the record from stage `attempt_count` to stage
    /// `attempt_count + 1` until every stage has been used; it then goes to the
    /// error topic. Non-retryable failures go straight to the invalid topic.
    pub fn route(&self, record: &InboundRecord, handling: &Handling) -> RetryDecision {
        match handling {
            Handling::Success => RetryDecision::Commit,
            Handling::NonRetryable(e) => RetryDecision::Quarantine {
                topic: self.topology.invalid_topic(),
                sink: Sink::Invalid,
                reason: e.to_string(),
            },
            Handling::Retryable(e) if record.attempt_count >= self.topology.max_attempts() => {
                RetryDecision::Quarantine {
                    topic: self.topology.error_topic(),
                    sink: Sink::Error,
                    reason: e.to_string(),
                }
            }
            Handling::Retryable(_) => {
                let attempt = record.attempt_count + 1;
                RetryDecision::Retry {
                    next_topic: self.topology.retry_topic(attempt),
                    delay: self.topology.backoff().delay_for(attempt),
                    attempt,
                }
            }
        }
    }

    /// Build the record to publish for a decision.
    ///
    /// The key and body are copied unchanged so the envelope is preserved.
    /// Returns `None` for [`RetryDecision::Commit`].
    pub fn outbound(
        &self,
        record: &InboundRecord,
        decision: &RetryDecision,
        now: DateTime<Utc>,
    ) -> Option<OutboundRecord> {
        match decision {
            RetryDecision::Commit => None,
            RetryDecision::Retry {
                next_topic,
                delay,
                attempt,
            } => {
                let delay = chrono::Duration::from_std(*delay).unwrap_or(chrono::Duration::MAX);
                let not_before = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
                Some(
                    OutboundRecord::from_inbound(next_topic, record)
                        .with_header(RETRY_COUNT_HEADER, encode_attempt_count(*attempt))
                        .with_header(
                            RETRY_NOT_BEFORE_HEADER,
                            encode_epoch_millis(not_before.timestamp_millis()),
                        ),
                )
            }
            RetryDecision::Quarantine { topic, reason, .. } => Some(
                OutboundRecord::from_inbound(topic, record)
                    .with_header(RETRY_COUNT_HEADER, encode_attempt_count(record.attempt_count))
                    .with_header(FAILURE_REASON_HEADER, reason.clone().into_bytes())
                    .with_header(ORIGINAL_TOPIC_HEADER, record.topic.clone().into_bytes()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessingError;
    use crate::router::topology::{Backoff, BackoffStrategy};
    use chrono::TimeZone;

    fn router(max_attempts: u32) -> RetryRouter {
        RetryRouter::new(RetryTopology::new(
            "stream-disqualifications",
            max_attempts,
            Backoff {
                strategy: BackoffStrategy::Linear,
                base: Duration::from_secs(15),
                multiplier: 2.0,
                max: Duration::from_secs(120),
            },
        ))
    }

    fn record(attempt_count: u32) -> InboundRecord {
        InboundRecord::new("stream-disqualifications", 2, 41, b"{\"resource_id\":\"1\"}".to_vec())
            .with_key("1")
            .with_attempt_count(attempt_count)
    }

    fn unavailable() -> Handling {
        Handling::Retryable(ProcessingError::ServerUnavailable { status: 503 })
    }

    #[test]
    fn test_success_commits() {
        assert_eq!(router(3).route(&record(0), &Handling::Success), RetryDecision::Commit);
        assert!(router(3)
            .outbound(&record(0), &RetryDecision::Commit, Utc::now())
            .is_none());
    }

    #[test]
    fn test_first_failure_goes_to_stage_one() {
        let decision = router(3).route(&record(0), &unavailable());

        assert_eq!(
            decision,
            RetryDecision::Retry {
                next_topic: "stream-disqualifications-retry".to_string(),
                delay: Duration::from_secs(15),
                attempt: 1,
            }
        );
    }

    #[test]
    fn test_stages_advance_one_at_a_time() {
        let router = router(4);
        for attempt in 0..4 {
            match router.route(&record(attempt), &unavailable()) {
                RetryDecision::Retry { attempt: next, delay, .. } => {
                    assert_eq!(next, attempt + 1);
                    assert_eq!(delay, router.topology().backoff().delay_for(next));
                }
                other => panic!("attempt {} routed to {:?}", attempt, other),
            }
        }
    }

    #[test]
    fn test_exhausted_retries_go_to_error() {
        let decision = router(3).route(&record(3), &unavailable());

        assert_eq!(
            decision,
            RetryDecision::Quarantine {
                topic: "stream-disqualifications-error".to_string(),
                sink: Sink::Error,
                reason: "Search API unavailable with status 503".to_string(),
            }
        );
    }

    #[test]
    fn test_non_retryable_goes_to_invalid() {
        let handling = Handling::NonRetryable(ProcessingError::MalformedPayload("eof".to_string()));
        let decision = router(3).route(&record(1), &handling);

        assert_eq!(
            decision,
            RetryDecision::Quarantine {
                topic: "stream-disqualifications-invalid".to_string(),
                sink: Sink::Invalid,
                reason: "Malformed payload: eof".to_string(),
            }
        );
    }

    #[test]
    fn test_retry_outbound_record() {
        let router = router(3);
        let record = record(0);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let decision = router.route(&record, &unavailable());

        let outbound = router.outbound(&record, &decision, now).unwrap();

        assert_eq!(outbound.topic, "stream-disqualifications-retry");
        assert_eq!(outbound.key, record.key);
        assert_eq!(outbound.payload, record.payload);
        assert_eq!(outbound.header(RETRY_COUNT_HEADER), Some(&b"1"[..]));
        let expected = (now.timestamp_millis() + 15_000).to_string();
        assert_eq!(
            outbound.header(RETRY_NOT_BEFORE_HEADER),
            Some(expected.as_bytes())
        );
    }

    #[test]
    fn test_quarantine_outbound_record() {
        let router = router(3);
        let record = record(3);
        let decision = router.route(&record, &unavailable());

        let outbound = router.outbound(&record, &decision, Utc::now()).unwrap();

        assert_eq!(outbound.topic, "stream-disqualifications-error");
        assert_eq!(outbound.payload, record.payload);
        assert_eq!(outbound.header(RETRY_COUNT_HEADER), Some(&b"3"[..]));
        assert_eq!(
            outbound.header(ORIGINAL_TOPIC_HEADER),
            Some(&b"stream-disqualifications"[..])
        );
        assert_eq!(
            outbound.header(FAILURE_REASON_HEADER),
            Some(&b"Search API unavailable with status 503"[..])
        );
        assert!(outbound.header(RETRY_NOT_BEFORE_HEADER).is_none());
    }
}
