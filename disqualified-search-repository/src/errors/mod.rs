//! Error types for the search repository.
//!
//! Document calls never fail with these errors; they report an `ApiOutcome`.
//! These errors cover client construction and index setup.

mod search_api_error;

pub use search_api_error::SearchApiError;
