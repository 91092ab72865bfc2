//! Error types for SpikeStream.

use thiserror::Error;

/// Main error type for SpikeStream operations.
#[derive(Error, Debug)]
pub enum SpikeStreamError {
    #[error("Invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    #[error("Mark limit reached: at most {limit} marks may be outstanding")]
    MarkLimit { limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for SpikeStream operations.
pub type Result<T> = std::result::Result<T, SpikeStreamError>;
