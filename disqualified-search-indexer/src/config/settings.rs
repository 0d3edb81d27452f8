//! Service settings read from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::config::dependencies::ConnectionMode;
use crate::publisher::DEFAULT_PUBLISH_MAX_ATTEMPTS;
use crate::router::{Backoff, BackoffStrategy, RetryTopology};
use crate::IndexingError;
use disqualified_search_kafka::KafkaClientSettings;
use disqualified_search_repository::opensearch::{IndexConfig, DEFAULT_INDEX_ALIAS};
use disqualified_search_repository::SearchApiConfig;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "disqualified-officer-search-consumer";

/// Client ID reported to the broker.
const KAFKA_CLIENT_ID: &str = "disqualified-search-indexer";

/// Default stream topic.
const DEFAULT_STREAM_TOPIC: &str = "stream-disqualifications";

/// Default resource kind accepted by the processor.
const DEFAULT_RESOURCE_KIND: &str = "disqualified-officers";

/// Default number of worker tasks.
const DEFAULT_WORKER_COUNT: usize = 4;

/// Default channel buffer size.
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 1000;

/// Default number of retry stages.
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 4;

/// Default base retry delay in milliseconds.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 15_000;

/// Default growth factor of the exponential backoff.
const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default upper bound of the retry delay in milliseconds.
const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 120_000;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default bound on a single search API call in milliseconds.
const DEFAULT_API_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Retry stage settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub strategy: BackoffStrategy,
    pub backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
    pub per_stage_topics: bool,
}

/// All settings of the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub kafka: KafkaClientSettings,
    pub group_id: String,
    pub stream_topic: String,
    pub resource_kind: String,
    pub worker_count: usize,
    pub channel_buffer_size: usize,
    pub retry: RetrySettings,
    pub publish_max_attempts: usize,
    pub opensearch_url: String,
    pub index_alias: String,
    pub index_version: u32,
    pub api_request_timeout: Duration,
    pub connection_mode: ConnectionMode,
    pub connection_retry_interval: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: disqualified-officer-search-consumer)
    /// - `KAFKA_USERNAME` / `KAFKA_PASSWORD`: SASL credentials (optional)
    /// - `KAFKA_SSL_CA_PEM`: Custom CA certificate in PEM format (optional)
    /// - `STREAM_TOPIC`: Stream topic (default: stream-disqualifications)
    /// - `RESOURCE_KIND`: Accepted resource kind (default: disqualified-officers)
    /// - `WORKER_COUNT`: Number of worker tasks (default: 4)
    /// - `CHANNEL_BUFFER_SIZE`: Record channel size and per-partition backlog before pausing (default: 1000)
    /// - `RETRY_MAX_ATTEMPTS`: Number of retry stages (default: 4)
    /// - `RETRY_BACKOFF_STRATEGY`: fixed, linear or exponential (default: linear)
    /// - `RETRY_BACKOFF_MS`: Base retry delay (default: 15000)
    /// - `RETRY_BACKOFF_MULTIPLIER`: Exponential growth factor (default: 2.0)
    /// - `RETRY_MAX_BACKOFF_MS`: Retry delay cap (default: 120000)
    /// - `RETRY_TOPIC_PER_STAGE`: One retry topic per stage (default: false)
    /// - `PUBLISH_MAX_ATTEMPTS`: Delivery attempts for republished records (default: 5)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_ALIAS`: Index alias name (default: disqualified-officers)
    /// - `INDEX_VERSION`: Index version number (default: 0)
    /// - `API_REQUEST_TIMEOUT_MS`: Bound on each search API call (default: 30000)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Connection retry interval (default: 15)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable.
    ///
    /// Unparseable numbers fall back to their default with a warning. An
    /// unknown backoff strategy is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut kafka = KafkaClientSettings::new(
            var("KAFKA_BROKER").unwrap_or_else(|| DEFAULT_KAFKA_BROKER.to_string()),
            KAFKA_CLIENT_ID,
        );
        if let (Some(username), Some(password)) = (var("KAFKA_USERNAME"), var("KAFKA_PASSWORD")) {
            kafka = kafka.with_credentials(username, password);
        }
        if let Some(ca_pem) = var("KAFKA_SSL_CA_PEM") {
            kafka = kafka.with_ssl_ca(ca_pem);
        }

        let strategy = match var("RETRY_BACKOFF_STRATEGY") {
            Some(value) => value
                .parse::<BackoffStrategy>()
                .map_err(|e| IndexingError::config(format!("RETRY_BACKOFF_STRATEGY: {}", e)))?,
            None => BackoffStrategy::Linear,
        };

        let retry = RetrySettings {
            max_attempts: parse_or("RETRY_MAX_ATTEMPTS", var("RETRY_MAX_ATTEMPTS"), DEFAULT_RETRY_MAX_ATTEMPTS),
            strategy,
            backoff: Duration::from_millis(parse_or(
                "RETRY_BACKOFF_MS",
                var("RETRY_BACKOFF_MS"),
                DEFAULT_RETRY_BACKOFF_MS,
            )),
            multiplier: parse_or(
                "RETRY_BACKOFF_MULTIPLIER",
                var("RETRY_BACKOFF_MULTIPLIER"),
                DEFAULT_RETRY_BACKOFF_MULTIPLIER,
            ),
            max_backoff: Duration::from_millis(parse_or(
                "RETRY_MAX_BACKOFF_MS",
                var("RETRY_MAX_BACKOFF_MS"),
                DEFAULT_RETRY_MAX_BACKOFF_MS,
            )),
            per_stage_topics: parse_flag("RETRY_TOPIC_PER_STAGE", var("RETRY_TOPIC_PER_STAGE")),
        };

        Ok(Self {
            kafka,
            group_id: var("KAFKA_GROUP_ID").unwrap_or_else(|| DEFAULT_KAFKA_GROUP_ID.to_string()),
            stream_topic: var("STREAM_TOPIC").unwrap_or_else(|| DEFAULT_STREAM_TOPIC.to_string()),
            resource_kind: var("RESOURCE_KIND")
                .unwrap_or_else(|| DEFAULT_RESOURCE_KIND.to_string()),
            worker_count: parse_or("WORKER_COUNT", var("WORKER_COUNT"), DEFAULT_WORKER_COUNT).max(1),
            channel_buffer_size: parse_or(
                "CHANNEL_BUFFER_SIZE",
                var("CHANNEL_BUFFER_SIZE"),
                DEFAULT_CHANNEL_BUFFER_SIZE,
            )
            .max(1),
            retry,
            publish_max_attempts: parse_or(
                "PUBLISH_MAX_ATTEMPTS",
                var("PUBLISH_MAX_ATTEMPTS"),
                DEFAULT_PUBLISH_MAX_ATTEMPTS,
            )
            .max(1),
            opensearch_url: var("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index_alias: var("INDEX_ALIAS").unwrap_or_else(|| DEFAULT_INDEX_ALIAS.to_string()),
            index_version: parse_or("INDEX_VERSION", var("INDEX_VERSION"), 0),
            api_request_timeout: Duration::from_millis(parse_or(
                "API_REQUEST_TIMEOUT_MS",
                var("API_REQUEST_TIMEOUT_MS"),
                DEFAULT_API_REQUEST_TIMEOUT_MS,
            )),
            connection_mode: ConnectionMode::parse(var("OPENSEARCH_CONNECTION_MODE").as_deref()),
            connection_retry_interval: Duration::from_secs(parse_or(
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                var("OPENSEARCH_RETRY_INTERVAL_SECS"),
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
        })
    }

    /// Retry topology for the stream topic.
    pub fn retry_topology(&self) -> RetryTopology {
        let backoff = Backoff {
            strategy: self.retry.strategy,
            base: self.retry.backoff,
            multiplier: self.retry.multiplier,
            max: self.retry.max_backoff,
        };
        RetryTopology::new(self.stream_topic.clone(), self.retry.max_attempts, backoff)
            .with_per_stage_topics(self.retry.per_stage_topics)
    }

    /// Search API client configuration.
    pub fn search_api_config(&self) -> SearchApiConfig {
        SearchApiConfig::new(
            self.opensearch_url.clone(),
            IndexConfig::new(self.index_alias.clone(), self.index_version),
        )
        .with_request_timeout(self.api_request_timeout)
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(variable = %key, value = %raw, "Invalid value, using default");
                default
            }
        },
    }
}

fn parse_flag(key: &str, value: Option<String>) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => false,
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => false,
        Some(v) => {
            warn!(variable = %key, value = %v, "Invalid flag, using default");
            false
        }
    }
}
