//! Interface definitions for the search API client.
//!
//! This module defines the abstract `SearchApiClient` trait that allows
//! for dependency injection and swappable search backend implementations.

mod search_api_client;

pub use search_api_client::SearchApiClient;
