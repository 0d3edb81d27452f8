//! Dependency initialization and wiring for the indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Settings;
use crate::consumer::KafkaConsumer;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::{DisqualificationTransformer, ResourceChangedProcessor};
use crate::publisher::KafkaPublisher;
use crate::router::RetryRouter;
use crate::IndexingError;
use disqualified_search_repository::{OpenSearchClient, SearchApiClient, SearchApiConfig};

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (in retry mode only
    ///   for failures other than reaching OpenSearch)
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        let topology = settings.retry_topology();

        info!(
            opensearch_url = %settings.opensearch_url,
            kafka_broker = %settings.kafka.broker,
            kafka_group_id = %settings.group_id,
            stream_topic = %settings.stream_topic,
            retry_stages = topology.max_attempts(),
            backoff_strategy = %settings.retry.strategy,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.connection_retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let search_client = Self::connect_to_opensearch(
            settings.search_api_config(),
            settings.connection_mode,
            settings.connection_retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let consumer = KafkaConsumer::new(
            &settings.kafka,
            &settings.group_id,
            topology.subscription_topics(),
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let publisher = KafkaPublisher::new(&settings.kafka, settings.publish_max_attempts)
            .map_err(|e| {
                IndexingError::config(format!("Failed to create Kafka producer: {}", e))
            })?;

        info!("Kafka producer created");

        let processor = ResourceChangedProcessor::new(
            Arc::new(DisqualificationTransformer::new()),
            Arc::new(search_client),
            settings.resource_kind.clone(),
        );
        let router = RetryRouter::new(topology);

        let orchestrator = Orchestrator::with_config(
            Arc::new(consumer),
            processor,
            router,
            Arc::new(publisher),
            OrchestratorConfig {
                channel_buffer_size: settings.channel_buffer_size,
                worker_count: settings.worker_count,
            },
        );

        Ok(Self { orchestrator })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        config: SearchApiConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchClient, IndexingError> {
        loop {
            match Self::try_connect_opensearch(config.clone()).await {
                Ok(client) => return Ok(client),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %config.url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Create the client and make sure the index and alias exist.
    async fn try_connect_opensearch(
        config: SearchApiConfig,
    ) -> Result<OpenSearchClient, IndexingError> {
        let client = OpenSearchClient::new(config).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?;

        client
            .ensure_index_exists()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        Ok(client)
    }
}
