//! Search API error types.

use thiserror::Error;

/// Errors from setting up the search API client or the search index.
#[derive(Debug, Clone, Error)]
pub enum SearchApiError {
    /// Invalid client configuration (e.g. a malformed URL).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to establish connection to the search backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to create the search index or its alias.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// The backend answered with an unexpected status.
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl SearchApiError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an unexpected status error.
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            body: body.into(),
        }
    }
}
