//! Processor module for the search indexer pipeline.
//!
//! Decodes change envelopes, transforms payloads into search documents,
//! applies them through the search API client and classifies the outcome.

pub mod classifier;
mod resource_changed;
pub mod transformer;

pub use classifier::{classify, Handling};
pub use resource_changed::ResourceChangedProcessor;
pub use transformer::{DisqualificationTransformer, DocumentTransformer, TransformError};
