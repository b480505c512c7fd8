use chrono::{DateTime, Utc};
use cofund_core::{EntityDetails, EntityId, FieldError, MemberId};
use cofund_workflow::{AuditEntry, EntityRecord, HistoryEntry, InAppNotification, TransitionPayload};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,

    /// Per-field failures for 422 responses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub fields: Vec<FieldError>,
}

/// Create an entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEntityRequest {
    /// Owning member; required for every kind except `member`
    #[serde(default)]
    pub member_id: Option<MemberId>,

    /// Detail payload tagged with `kind`
    #[schema(value_type = Object)]
    pub details: EntityDetails,
}

/// Replace an entity's detail fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateEntityRequest {
    #[schema(value_type = Object)]
    pub details: EntityDetails,
}

/// Optional transition payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransitionRequest {
    /// Verification or rejection note
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub note: Option<String>,

    /// Receipt or disbursement reference
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub reference: Option<String>,
}

impl From<TransitionRequest> for TransitionPayload {
    fn from(req: TransitionRequest) -> Self {
        TransitionPayload {
            note: req.note,
            reference: req.reference,
        }
    }
}

/// Entity as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntityResponse {
    pub id: EntityId,
    pub kind: String,
    pub member_id: MemberId,
    pub status: String,

    #[schema(value_type = Object)]
    pub details: EntityDetails,

    #[schema(value_type = Vec<Object>)]
    pub history: Vec<HistoryEntry>,

    pub version: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<EntityRecord> for EntityResponse {
    fn from(record: EntityRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind.to_string(),
            member_id: record.member_id,
            status: record.status.to_string(),
            details: record.details,
            history: record.history,
            version: record.version,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        }
    }
}

/// List entities response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListEntitiesResponse {
    pub items: Vec<EntityResponse>,
    pub total: usize,
}

/// Transitions the caller may take now
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionsResponse {
    pub entity_id: EntityId,
    pub status: String,
    pub transitions: Vec<String>,
}

/// One audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: EntityId,

    #[schema(value_type = Option<Object>)]
    pub before: Option<serde_json::Value>,

    #[schema(value_type = Option<Object>)]
    pub after: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            action: entry.action,
            entity_type: entry.entity_type.to_string(),
            entity_id: entry.entity_id,
            before: entry.before,
            after: entry.after,
            timestamp: entry.timestamp,
        }
    }
}

/// Audit trail response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditTrailResponse {
    pub entries: Vec<AuditEntryResponse>,
    pub total: usize,
}

/// One in-app notification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: uuid::Uuid,
    pub message: String,
    pub kind: String,
    pub entity_id: EntityId,
    pub action: String,
    pub status: String,
    pub at: DateTime<Utc>,
}

impl From<InAppNotification> for NotificationResponse {
    fn from(n: InAppNotification) -> Self {
        Self {
            id: n.id,
            message: n.message,
            kind: n.event.kind.to_string(),
            entity_id: n.event.entity_id,
            action: n.event.action,
            status: n.event.to.to_string(),
            at: n.event.at,
        }
    }
}

/// Inbox response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
    pub total: usize,
}
