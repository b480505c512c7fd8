//! Cofund workflow engine
//!
//! Approval workflows for a community fund's members, contributions, loans,
//! health claims, cashout requests and program enrollments.
//!
//! - [`machine`]: immutable per-kind state machines
//! - [`policy`]: `permission AND guard` decisions
//! - [`permissions`]: role to permission resolution
//! - [`engine`]: the orchestrator running each operation as one unit of work
//! - [`store`]: in-memory and PostgreSQL persistence
//! - [`audit`]: append-only trail written with every change
//! - [`notify`]: retrying post-commit notifications

pub mod audit;
pub mod engine;
pub mod error;
pub mod machine;
pub mod notify;
pub mod permissions;
pub mod policy;
pub mod store;
pub mod types;

pub use audit::{AuditEntry, AuditQuery, AuditRecorder};
pub use engine::{EngineConfig, WorkflowMetrics, WorkflowOrchestrator};
pub use error::{Result, WorkflowError};
pub use machine::{machine_for, Edge, Guard, Machine};
pub use notify::{
    InAppNotification, InAppNotifier, LogNotifier, NotificationDispatcher, Notifier, Recipient,
    WorkflowEvent,
};
pub use permissions::{PermissionSource, RoleDefinition, StaticRolePermissions};
pub use policy::PolicyEngine;
pub use store::{InMemoryStore, ListFilter, StoreTransaction, WorkflowStore};
pub use types::{Action, Decision, EntityRecord, HistoryEntry, NewEntity, TransitionPayload};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
