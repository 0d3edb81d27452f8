//! # Disqualified Search Indexer
//!
//! Consumes resource-changed envelopes for disqualified officers from Kafka
//! and applies them to the search index, routing failed records through a
//! chain of delayed retry topics.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Reads the stream topic and its retry topics
//! 2. **Processor**: Decodes the envelope and upserts or removes the document
//! 3. **Router**: Turns the outcome into commit, retry or quarantine
//! 4. **Publisher**: Republishes retried and quarantined records
//! 5. **Orchestrator**: Runs the workers and commits acknowledged offsets
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`consumer`]: Kafka consumer for change envelopes
//! - [`processor`]: Envelope decoding, transformation and outcome classification
//! - [`router`]: Retry topology and routing decisions
//! - [`publisher`]: Republishing of records to retry and terminal topics
//! - [`orchestrator`]: Coordinates the pipeline
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod consumer;
pub mod errors;
pub mod orchestrator;
pub mod processor;
pub mod publisher;
pub mod router;

pub use config::{Dependencies, Settings};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
