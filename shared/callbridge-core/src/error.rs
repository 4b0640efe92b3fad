//! Error types for Callbridge services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CallbridgeError>;

#[derive(Error, Debug)]
pub enum CallbridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallbridgeError {
    /// Transient failures worth another attempt: not-ready (404), throttling,
    /// server-side errors and connectivity problems.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::NotFound(_) => true,
            Self::Upstream { status, .. } => *status == 404 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for CallbridgeError {
    fn from(err: std::io::Error) -> Self {
        CallbridgeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CallbridgeError {
    fn from(err: serde_json::Error) -> Self {
        CallbridgeError::Protocol(err.to_string())
    }
}
