//! Error types for operator actions.

use thiserror::Error;

use uptime_state::{ConfigError, ImportError};

/// Result type alias for operator actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// A rejected operator action. The registry is unchanged whenever one
/// of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("a service named '{0}' already exists")]
    DuplicateName(String),

    #[error("service name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
