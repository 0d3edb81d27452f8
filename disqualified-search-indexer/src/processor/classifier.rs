//! Classification of search API outcomes.

use disqualified_search_repository::ApiOutcome;

use crate::errors::ProcessingError;

/// How a record should be handled after processing.
///
/// Produced by [`classify`] for API outcomes and by the processor for decode
/// and transform failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handling {
    Success,
    Retryable(ProcessingError),
    NonRetryable(ProcessingError),
}

/// Map an API outcome to its handling class.
///
/// | Outcome            | Class        |
/// |--------------------|--------------|
/// | `Success`          | Success      |
/// | `ServerError`      | Retryable    |
/// | `TransportFailure` | Retryable    |
/// | `ClientError`      | NonRetryable |
pub fn classify(outcome: &ApiOutcome) -> Handling {
    match outcome {
        ApiOutcome::Success => Handling::Success,
        ApiOutcome::ServerError { status } => {
            Handling::Retryable(ProcessingError::ServerUnavailable { status: *status })
        }
        ApiOutcome::TransportFailure { cause } => {
            Handling::Retryable(ProcessingError::NetworkFailure(cause.clone()))
        }
        ApiOutcome::ClientError { status } => {
            Handling::NonRetryable(ProcessingError::ClientRejected { status: *status })
        }
    }
}
