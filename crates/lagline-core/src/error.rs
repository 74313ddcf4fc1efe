//! Error types for the data model.

use thiserror::Error;

/// Errors raised by the core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid mode: {0:?} (expected BOOT or LIVE)")]
    InvalidMode(String),

    #[error("Record id space exhausted for the current millisecond")]
    IdSpaceExhausted,
}

pub type Result<T> = std::result::Result<T, CoreError>;
