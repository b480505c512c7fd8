//! Workflow persistence
//!
//! Every state change runs inside one [`StoreTransaction`]: the entity row
//! is locked, updated and its audit entry appended, then committed together.
//! Dropping a transaction without committing discards all of it.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresStore};

use crate::audit::{AuditEntry, AuditQuery};
use crate::error::Result;
use crate::types::EntityRecord;
use async_trait::async_trait;
use cofund_core::{EntityId, EntityKind, MemberId};

/// Listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only records owned by this member
    pub member_id: Option<MemberId>,
    /// Include soft-deleted records
    pub include_deleted: bool,
}

impl ListFilter {
    pub fn owned_by(member_id: MemberId) -> Self {
        Self {
            member_id: Some(member_id),
            include_deleted: false,
        }
    }

    pub fn matches(&self, record: &EntityRecord) -> bool {
        self.member_id.map_or(true, |m| m == record.member_id)
            && (self.include_deleted || !record.is_deleted())
    }
}

/// Workflow store backend
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Read one record without locking
    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>>;

    /// Records of a kind, oldest first
    async fn list(&self, kind: EntityKind, filter: ListFilter) -> Result<Vec<EntityRecord>>;

    /// Audit entries, oldest first
    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>>;
}

/// One atomic unit of work
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a record and hold it until commit or drop
    async fn lock(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>>;

    async fn insert(&mut self, record: &EntityRecord) -> Result<()>;

    /// Replace a record. Fails unless `record.version` is exactly one
    /// past the stored version.
    async fn update(&mut self, record: &EntityRecord) -> Result<()>;

    /// Remove a record permanently
    async fn remove(&mut self, kind: EntityKind, id: EntityId) -> Result<()>;

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<()>;

    /// Make every staged write visible at once
    async fn commit(self: Box<Self>) -> Result<()>;
}
