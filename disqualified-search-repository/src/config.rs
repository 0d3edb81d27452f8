//! Configuration types for the search API client.

use std::time::Duration;

use crate::opensearch::IndexConfig;

/// Default bound on a single search API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a search API client.
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    /// Search backend URL (e.g. "http://localhost:9200").
    pub url: String,
    /// Index alias and version that documents are written to.
    pub index: IndexConfig,
    /// Upper bound for each call. Expiry is reported as a transport failure.
    pub request_timeout: Duration,
}

impl SearchApiConfig {
    /// Create a config with the default request timeout.
    pub fn new(url: impl Into<String>, index: IndexConfig) -> Self {
        Self {
            url: url.into(),
            index,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
