//! Workflow records, actions and decisions

use chrono::{DateTime, Utc};
use cofund_core::{
    EntityDetails, EntityId, EntityKind, FieldError, MemberId, Status, Transition, UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Action checked by the policy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "transition")]
pub enum Action {
    View,
    ViewAny,
    Create,
    Update,
    Delete,
    Restore,
    ForceDelete,
    Transition(Transition),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::View => f.write_str("view"),
            Action::ViewAny => f.write_str("view_any"),
            Action::Create => f.write_str("create"),
            Action::Update => f.write_str("update"),
            Action::Delete => f.write_str("delete"),
            Action::Restore => f.write_str("restore"),
            Action::ForceDelete => f.write_str("force_delete"),
            Action::Transition(t) => f.write_str(t.as_str()),
        }
    }
}

/// Policy decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action is allowed
    pub allowed: bool,

    /// Action the decision was made for
    pub action: Action,

    /// Reason for the decision
    pub reason: String,
}

impl Decision {
    /// Allow decision
    pub fn allow(action: Action, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            action,
            reason: reason.into(),
        }
    }

    /// Deny decision
    pub fn deny(action: Action, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            action,
            reason: reason.into(),
        }
    }
}

fn validate_reference(reference: &str) -> Result<(), ValidationError> {
    let valid = reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'));

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("reference");
        err.message = Some("reference may only contain letters, digits, '-', '_', '/' and '.'".into());
        Err(err)
    }
}

/// Optional data attached to a transition request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TransitionPayload {
    /// Free-text note, required when rejecting or suspending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub note: Option<String>,

    /// External payment reference, required when disbursing or paying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128), custom(function = "validate_reference"))]
    pub reference: Option<String>,
}

impl TransitionPayload {
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Run the field checks, flattened into per-field errors
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate()
            .map_err(|e| cofund_core::types::field_errors(&e))
    }
}

/// One committed transition in an entity's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub transition: Transition,
    pub from: Status,
    pub to: Status,
    pub by: UserId,
    pub at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Request to create a new entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntity {
    /// Owning member. Ignored for members, defaults to the actor's member.
    #[serde(default)]
    pub member_id: Option<MemberId>,

    pub details: EntityDetails,
}

impl NewEntity {
    pub fn new(details: EntityDetails) -> Self {
        Self {
            member_id: None,
            details,
        }
    }

    pub fn for_member(mut self, member_id: MemberId) -> Self {
        self.member_id = Some(member_id);
        self
    }
}

/// A persisted workflow entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: EntityKind,

    /// Owning member; a member record owns itself
    pub member_id: MemberId,

    /// User linked to the owning member, notified on status changes
    #[serde(default)]
    pub owner_user_id: Option<UserId>,

    pub status: Status,
    pub details: EntityDetails,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Incremented on every committed change
    pub version: i64,

    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EntityRecord {
    /// Fresh record in the given initial status
    pub fn new(
        kind: EntityKind,
        member_id: Option<MemberId>,
        status: Status,
        details: EntityDetails,
        created_by: impl Into<UserId>,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            kind,
            member_id: member_id.unwrap_or(id),
            owner_user_id: None,
            status,
            details,
            history: Vec::new(),
            version: 1,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Copy of this record for the next committed change
    pub fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }

    /// JSON snapshot stored in the audit log
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
