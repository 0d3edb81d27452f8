//! # Disqualified Search Repository
//!
//! This crate provides the interface and implementation used to apply
//! disqualified officer documents to the search index. Calls report a
//! structured [`ApiOutcome`] instead of failing, so that callers can decide
//! how each outcome is handled.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::SearchApiConfig;
pub use errors::SearchApiError;
pub use interfaces::SearchApiClient;
pub use opensearch::OpenSearchClient;
pub use types::ApiOutcome;
