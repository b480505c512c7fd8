//! # Cofund Core
//!
//! Shared domain vocabulary for the Cofund workflow service: entity kinds,
//! statuses, transitions, permissions, detail payloads and the acting user.
//! Both the workflow engine and the API server depend on this crate.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    ActingUser, EntityDetails, EntityId, EntityKind, FieldError, MemberId, Permission,
    PermissionSet, Status, Transition, UserId,
};
