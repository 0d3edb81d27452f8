//! Retry routing for records that could not be applied.
//!
//! A failed record is republished on the next retry stage, or quarantined on a
//! terminal topic, before its offset is committed.

mod retry_router;
mod topology;

pub use retry_router::{RetryDecision, RetryRouter, Sink};
pub use topology::{Backoff, BackoffStrategy, RetryTopology};
