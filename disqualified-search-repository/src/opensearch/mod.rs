//! OpenSearch implementation of the search API client.
//!
//! This module provides a concrete implementation of `SearchApiClient`
//! using OpenSearch as the backend.

mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{get_index_settings, IndexConfig, DEFAULT_INDEX_ALIAS};
