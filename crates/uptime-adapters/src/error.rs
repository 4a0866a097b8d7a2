//! Error types for external adapters.

use thiserror::Error;

/// Result type alias for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// A failed call to an external collaborator. These are surfaced to the
/// operator as transient notifications and never enter the event log.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("connection error: server responded with HTTP {0}")]
    Status(u16),

    #[error("connection error: malformed response: {0}")]
    Malformed(String),

    #[error("API key not configured")]
    MissingCredentials,
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AdapterError::Status(status.as_u16()),
            None => AdapterError::Connection(err.to_string()),
        }
    }
}
