//! Append-only audit trail of committed changes
//!
//! Each entry records who did what to which entity, with JSON snapshots
//! of the record before and after. Entries are written through the same
//! store transaction as the change they describe.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE audit_log (
//!     id UUID PRIMARY KEY,
//!     user_id VARCHAR(255) NOT NULL,
//!     action VARCHAR(64) NOT NULL,
//!     entity_type VARCHAR(64) NOT NULL,
//!     entity_id UUID NOT NULL,
//!     before JSONB,
//!     after JSONB,
//!     timestamp TIMESTAMPTZ NOT NULL
//! );
//! ```

use crate::error::Result;
use crate::store::StoreTransaction;
use crate::types::EntityRecord;
use chrono::{DateTime, Utc};
use cofund_core::{ActingUser, EntityId, EntityKind, Status, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID
    pub id: Uuid,

    /// User who made the change
    pub user_id: UserId,

    /// Operation or transition name (e.g., "created", "approve_l1")
    pub action: String,

    pub entity_type: EntityKind,
    pub entity_id: EntityId,

    /// Snapshot before the change, absent on creation
    pub before: Option<serde_json::Value>,

    /// Snapshot after the change, absent on hard deletion
    pub after: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn before_status(&self) -> Option<Status> {
        Self::status_of(self.before.as_ref())
    }

    pub fn after_status(&self) -> Option<Status> {
        Self::status_of(self.after.as_ref())
    }

    fn status_of(snapshot: Option<&serde_json::Value>) -> Option<Status> {
        snapshot
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
            .and_then(|s| Status::from_str(s).ok())
    }
}

/// Audit trail filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<EntityId>,
    pub user_id: Option<UserId>,
    /// 0 means unlimited
    pub limit: usize,
}

impl AuditQuery {
    /// Entries for one entity
    pub fn for_entity(kind: EntityKind, id: EntityId) -> Self {
        Self {
            entity_type: Some(kind),
            entity_id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.map_or(true, |k| k == entry.entity_type)
            && self.entity_id.map_or(true, |id| id == entry.entity_id)
            && self.user_id.as_ref().map_or(true, |u| *u == entry.user_id)
    }
}

/// Builds audit entries and appends them to an open transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditRecorder;

impl AuditRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Append an entry for a change to the transaction
    pub async fn record(
        &self,
        tx: &mut dyn StoreTransaction,
        actor: &ActingUser,
        action: &str,
        before: Option<&EntityRecord>,
        after: Option<&EntityRecord>,
    ) -> Result<AuditEntry> {
        let subject = after.or(before);
        let (entity_type, entity_id) = match subject {
            Some(r) => (r.kind, r.id),
            None => {
                return Err(crate::error::WorkflowError::Internal(
                    "audit entry needs a record".to_string(),
                ))
            }
        };

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            user_id: actor.id.clone(),
            action: action.to_string(),
            entity_type,
            entity_id,
            before: before.map(EntityRecord::snapshot),
            after: after.map(EntityRecord::snapshot),
            timestamp: Utc::now(),
        };

        tx.append_audit(&entry).await?;

        debug!(
            entry = %entry.id,
            user = %entry.user_id,
            action = %entry.action,
            entity = %entry.entity_id,
            "Audit entry staged"
        );

        Ok(entry)
    }
}
