//! Core error types
//!
//! Raised while parsing the domain vocabulary from strings (path segments,
//! database columns, role files).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for the Cofund domain vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Unknown entity kind
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// Unknown status name
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// Unknown transition name
    #[error("Unknown transition: {0}")]
    UnknownTransition(String),

    /// Unknown permission name
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Invalid input/state
    #[error("Invalid: {0}")]
    Invalid(String),
}

impl CoreError {
    /// Create an invalid error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        CoreError::Invalid(msg.into())
    }
}
