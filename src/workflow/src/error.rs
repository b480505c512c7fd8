//! Error types for the workflow engine

use cofund_core::{CoreError, EntityId, EntityKind, FieldError, Status, Transition};
use thiserror::Error;

/// Workflow engine errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The acting user lacks the permission or the guard failed
    #[error("Unauthorized to {action}: {reason}")]
    Unauthorized { action: String, reason: String },

    /// No edge for this transition from the current status
    #[error("Invalid transition '{transition}' for {kind} in status '{status}'")]
    InvalidTransition {
        kind: EntityKind,
        transition: Transition,
        status: Status,
    },

    /// Soft-deleted entities accept no transitions
    #[error("Invalid transition: {kind} {id} is deleted")]
    EntityDeleted { kind: EntityKind, id: EntityId },

    /// Payload or detail fields failed their checks
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    /// Entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// Store failure, nothing was committed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Notification delivery failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// Invalid role or engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Name parsing error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkflowError {
    pub fn unauthorized(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Invalid transitions include transitions attempted on deleted entities
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::EntityDeleted { .. }
        )
    }

    /// Short label used for metrics and logs
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidTransition { .. } | Self::EntityDeleted { .. } => "invalid_transition",
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Persistence(_) => "persistence",
            Self::Notification(_) => "notification",
            Self::Configuration(_) | Self::Core(_) | Self::Internal(_) | Self::Io(_) => "error",
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for WorkflowError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Persistence(format!("migration failed: {}", err))
    }
}

impl From<prometheus::Error> for WorkflowError {
    fn from(err: prometheus::Error) -> Self {
        Self::Internal(format!("metrics: {}", err))
    }
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
