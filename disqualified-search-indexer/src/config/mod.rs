//! Configuration and dependency initialization for the indexer.

mod dependencies;
mod settings;

pub use dependencies::{ConnectionMode, Dependencies};
pub use settings::{RetrySettings, Settings};
