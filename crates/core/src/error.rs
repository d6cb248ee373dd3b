//! Error types for the grid backtesting system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the grid backtesting system.
///
/// Only configuration and input-data problems are errors. Runtime edge cases inside a
/// simulation (empty series, zero levels, blocked sells) degrade to no-op results instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error. The run is rejected before simulating.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed or unordered price series).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Whether this error rejects the strategy configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
