//! Outcome types for search API calls.

/// Result of a single call to the search API.
///
/// Every call resolves to exactly one outcome. The client never retries; it
/// reports what happened and leaves the handling decision to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    /// The call was applied (2xx).
    Success,
    /// The request was rejected by the API (4xx).
    ClientError { status: u16 },
    /// The API failed to handle the request (5xx or an unexpected status).
    ServerError { status: u16 },
    /// The call did not produce a response (connection failure, timeout).
    TransportFailure { cause: String },
}

impl ApiOutcome {
    /// Derive an outcome from an HTTP status code.
    ///
    /// Statuses outside the 2xx and 4xx ranges are reported as server errors.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::ClientError { status },
            _ => Self::ServerError { status },
        }
    }

    /// Create a transport failure outcome.
    pub fn transport_failure(cause: impl Into<String>) -> Self {
        Self::TransportFailure {
            cause: cause.into(),
        }
    }

    /// Whether the call was applied.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClientError { status } | Self::ServerError { status } => Some(*status),
            Self::Success | Self::TransportFailure { .. } => None,
        }
    }
}

impl std::fmt::Display for ApiOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ClientError { status } => write!(f, "client error (status {})", status),
            Self::ServerError { status } => write!(f, "server error (status {})", status),
            Self::TransportFailure { cause } => write!(f, "transport failure: {}", cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(ApiOutcome::from_status(200), ApiOutcome::Success);
        assert_eq!(ApiOutcome::from_status(201), ApiOutcome::Success);
        assert_eq!(
            ApiOutcome::from_status(400),
            ApiOutcome::ClientError { status: 400 }
        );
        assert_eq!(
            ApiOutcome::from_status(404),
            ApiOutcome::ClientError { status: 404 }
        );
        assert_eq!(
            ApiOutcome::from_status(503),
            ApiOutcome::ServerError { status: 503 }
        );
        assert_eq!(
            ApiOutcome::from_status(302),
            ApiOutcome::ServerError { status: 302 }
        );
    }

    #[test]
    fn test_status() {
        assert_eq!(ApiOutcome::Success.status(), None);
        assert_eq!(ApiOutcome::transport_failure("timed out").status(), None);
        assert_eq!(ApiOutcome::ClientError { status: 409 }.status(), Some(409));
    }
}
