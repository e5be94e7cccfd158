//! Error types for the strength_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for strength_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A clamp was requested with an empty interval
    #[error("Invalid range: min {min} exceeds max {max}")]
    InvalidRange { min: f64, max: f64 },

    /// A leaf utility received input outside its contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
