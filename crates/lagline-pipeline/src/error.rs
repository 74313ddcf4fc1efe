//! Error types for the pipeline stages.

use lagline_core::CoreError;
use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Subscribing to a stage failed because its topic is closed.
    #[error("Subscription setup failed: topic '{topic}' is closed")]
    SubscriptionSetup { topic: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
