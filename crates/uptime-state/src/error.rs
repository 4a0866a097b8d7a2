//! Error types for the UptimeShield state crate.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

/// A rejected import payload. The registry is never touched when one of
/// these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("error parsing JSON: {0}")]
    Parse(String),

    #[error("invalid format: expected an array of services")]
    NotAnArray,

    #[error("invalid service at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("duplicate service id in payload: {0}")]
    DuplicateId(String),
}

/// A settings value outside its recognized range.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("checkInterval must be between 1 and 60 seconds, got {0}")]
    CheckInterval(u32),

    #[error("smtpPort must be non-zero")]
    SmtpPort,

    #[error("recipientEmail is required when emailNotifications is enabled")]
    MissingRecipient,
}
