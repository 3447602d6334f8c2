//! Error types for the station link engine
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::policy::StationMode;

/// Result type alias for station link operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the station link engine
#[derive(Error, Debug)]
pub enum Error {
    /// A station mode that cannot be applied (policy error)
    #[error("Unsupported station mode: {0}")]
    UnsupportedMode(StationMode),

    /// Credential / key-value store errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Wi-Fi driver rejected a connect or disconnect request
    #[error("Driver error: {0}")]
    Driver(String),

    /// A backoff timer or deferred work item could not be scheduled
    #[error("Timer scheduling error: {0}")]
    TimerScheduling(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a driver error
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    /// Create a timer scheduling error
    pub fn timer(msg: impl Into<String>) -> Self {
        Self::TimerScheduling(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mode_names_the_mode() {
        let err = Error::UnsupportedMode(StationMode::NotSupported);
        assert_eq!(err.to_string(), "Unsupported station mode: NotSupported");
    }

    #[test]
    fn anyhow_errors_become_other() {
        let err: Error = anyhow::anyhow!("radio unplugged").into();
        assert!(matches!(err, Error::Other(ref msg) if msg == "radio unplugged"));
    }
}
