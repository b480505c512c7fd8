//! Workflow orchestrator
//!
//! Runs every operation as one unit of work:
//!
//! ```text
//! lock entity → policy decision → mutate → audit entry → commit → notify
//!                    ↓ deny                                  ↓
//!              Unauthorized                          [background task]
//! ```
//!
//! Any failure before commit drops the transaction, so the entity and the
//! audit log are left exactly as they were.

pub mod metrics;

pub use metrics::WorkflowMetrics;

use crate::audit::{AuditEntry, AuditQuery, AuditRecorder};
use crate::error::{Result, WorkflowError};
use crate::machine::machine_for;
use crate::notify::{NotificationDispatcher, Notifier, Recipient, WorkflowEvent};
use crate::permissions::PermissionSource;
use crate::policy::PolicyEngine;
use crate::store::{ListFilter, StoreTransaction, WorkflowStore};
use crate::types::{Action, EntityRecord, HistoryEntry, NewEntity, TransitionPayload};
use chrono::Utc;
use cofund_core::{ActingUser, EntityDetails, EntityId, EntityKind, Permission, Status, Transition};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delivery attempts per notification
    pub notify_max_attempts: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub notify_backoff: Duration,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notify_max_attempts: 3,
            notify_backoff: Duration::from_millis(200),
            enable_metrics: true,
        }
    }
}

/// Applies operations to workflow entities
pub struct WorkflowOrchestrator {
    store: Arc<dyn WorkflowStore>,
    permissions: Arc<dyn PermissionSource>,
    policy: PolicyEngine,
    audit: AuditRecorder,
    dispatcher: NotificationDispatcher,
    metrics: Option<Arc<WorkflowMetrics>>,
    config: EngineConfig,
}

impl WorkflowOrchestrator {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn WorkflowStore>,
        permissions: Arc<dyn PermissionSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let metrics = if config.enable_metrics {
            Some(Arc::new(WorkflowMetrics::new()?))
        } else {
            None
        };

        let mut dispatcher =
            NotificationDispatcher::new(notifier, config.notify_max_attempts, config.notify_backoff);
        if let Some(metrics) = &metrics {
            dispatcher = dispatcher.with_metrics(metrics.clone());
        }

        info!(
            notify_max_attempts = config.notify_max_attempts,
            metrics = config.enable_metrics,
            "WorkflowOrchestrator initialized"
        );

        Ok(Self {
            store,
            permissions,
            policy: PolicyEngine::new(),
            audit: AuditRecorder::new(),
            dispatcher,
            metrics,
            config,
        })
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionSource> {
        &self.permissions
    }

    pub fn metrics(&self) -> Option<&Arc<WorkflowMetrics>> {
        self.metrics.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a named transition.
    ///
    /// Payload checks run first, then the edge lookup (`InvalidTransition`),
    /// then the permission check (`Unauthorized`). The status change, the
    /// history entry and the audit entry commit together.
    pub async fn execute(
        &self,
        kind: EntityKind,
        id: EntityId,
        transition: Transition,
        actor: &ActingUser,
        payload: TransitionPayload,
    ) -> Result<EntityRecord> {
        let start = Instant::now();
        let result = self
            .execute_transition(kind, id, transition, actor, payload)
            .await;
        self.observe(kind, transition.as_str(), &result, start);
        result
    }

    async fn execute_transition(
        &self,
        kind: EntityKind,
        id: EntityId,
        transition: Transition,
        actor: &ActingUser,
        payload: TransitionPayload,
    ) -> Result<EntityRecord> {
        payload.check().map_err(WorkflowError::Validation)?;

        let mut tx = self.store.begin().await?;
        let before = Self::locked(tx.as_mut(), kind, id).await?;

        if before.is_deleted() {
            return Err(WorkflowError::EntityDeleted { kind, id });
        }

        let edge = machine_for(kind)
            .admits(&before, transition)
            .ok_or(WorkflowError::InvalidTransition {
                kind,
                transition,
                status: before.status,
            })?;

        let decision = self.policy.can_transition(actor, &before, transition);
        if !decision.allowed {
            return Err(WorkflowError::unauthorized(transition.as_str(), decision.reason));
        }

        if edge.needs_note && payload.note.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(WorkflowError::invalid_field("note", format!("{} requires a note", transition)));
        }
        if edge.needs_reference && payload.reference.is_none() {
            return Err(WorkflowError::invalid_field(
                "reference",
                format!("{} requires a payment reference", transition),
            ));
        }

        let mut after = before.next_version();
        let at = after.updated_at;
        edge.apply(&mut after, at);
        after.history.push(HistoryEntry {
            transition,
            from: before.status,
            to: after.status,
            by: actor.id.clone(),
            at: after.updated_at,
            note: payload.note,
            reference: payload.reference,
        });

        tx.update(&after).await?;
        self.audit
            .record(tx.as_mut(), actor, transition.as_str(), Some(&before), Some(&after))
            .await?;
        tx.commit().await?;

        info!(
            kind = %kind,
            entity = %id,
            transition = %transition,
            from = %before.status,
            to = %after.status,
            user = %actor.id,
            "Transition committed"
        );

        self.notify(&after, actor, transition.as_str(), Some(before.status));
        Ok(after)
    }

    /// Create an entity in its kind's initial status
    pub async fn create(
        &self,
        kind: EntityKind,
        actor: &ActingUser,
        new: NewEntity,
    ) -> Result<EntityRecord> {
        let start = Instant::now();
        let result = self.create_entity(kind, actor, new).await;
        self.observe(kind, "create", &result, start);
        result
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        actor: &ActingUser,
        new: NewEntity,
    ) -> Result<EntityRecord> {
        new.details
            .validate_for(kind)
            .map_err(WorkflowError::Validation)?;
        if let Some(enrollment) = new.details.as_enrollment() {
            if enrollment.certificate_issued || enrollment.certificate_issued_at.is_some() {
                return Err(WorkflowError::invalid_field(
                    "certificate_issued",
                    "certificates are issued by the issue_certificate transition",
                ));
            }
        }

        let target = if kind == EntityKind::Member {
            None
        } else {
            Some(
                new.member_id
                    .or(actor.member_id)
                    .ok_or_else(|| WorkflowError::invalid_field("member_id", "owning member is required"))?,
            )
        };

        let decision = self.policy.can_create(actor, kind, target);
        if !decision.allowed {
            return Err(WorkflowError::unauthorized("create", decision.reason));
        }

        let mut tx = self.store.begin().await?;
        let machine = machine_for(kind);

        let mut record = match target {
            None => {
                let mut record =
                    EntityRecord::new(kind, None, machine.initial, new.details, actor.id.clone());
                if !actor.can(Permission::CreateMembers) {
                    record.owner_user_id = Some(actor.id.clone());
                }
                record
            }
            Some(member_id) => {
                let member = tx
                    .lock(EntityKind::Member, member_id)
                    .await?
                    .filter(|m| !m.is_deleted())
                    .ok_or_else(|| WorkflowError::invalid_field("member_id", "unknown member"))?;
                if member.status != Status::Active {
                    return Err(WorkflowError::invalid_field(
                        "member_id",
                        format!("member is {}, not active", member.status),
                    ));
                }

                let mut record = EntityRecord::new(
                    kind,
                    Some(member_id),
                    machine.initial,
                    new.details,
                    actor.id.clone(),
                );
                record.owner_user_id = member.owner_user_id;
                record
            }
        };

        tx.insert(&record).await?;
        self.audit
            .record(tx.as_mut(), actor, "created", None, Some(&record))
            .await?;
        tx.commit().await?;

        info!(kind = %kind, entity = %record.id, member = %record.member_id, user = %actor.id, "Entity created");

        self.notify(&record, actor, "created", None);
        Ok(record)
    }

    /// Replace an entity's details while its status allows editing
    pub async fn update(
        &self,
        kind: EntityKind,
        id: EntityId,
        actor: &ActingUser,
        details: EntityDetails,
    ) -> Result<EntityRecord> {
        let start = Instant::now();
        let result = self.update_entity(kind, id, actor, details).await;
        self.observe(kind, "update", &result, start);
        result
    }

    async fn update_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
        actor: &ActingUser,
        mut details: EntityDetails,
    ) -> Result<EntityRecord> {
        details.validate_for(kind).map_err(WorkflowError::Validation)?;

        let mut tx = self.store.begin().await?;
        let before = Self::locked(tx.as_mut(), kind, id).await?;
        if before.is_deleted() {
            return Err(WorkflowError::EntityDeleted { kind, id });
        }

        let decision = self.policy.can_update(actor, &before);
        if !decision.allowed {
            return Err(WorkflowError::unauthorized("update", decision.reason));
        }

        // Certificate fields only change through their transition
        if let (Some(old), Some(new)) = (before.details.as_enrollment(), details.as_enrollment_mut()) {
            new.certificate_issued = old.certificate_issued;
            new.certificate_issued_at = old.certificate_issued_at;
        }

        let mut after = before.next_version();
        after.details = details;

        tx.update(&after).await?;
        self.audit
            .record(tx.as_mut(), actor, "updated", Some(&before), Some(&after))
            .await?;
        tx.commit().await?;

        info!(kind = %kind, entity = %id, user = %actor.id, "Entity updated");
        Ok(after)
    }

    /// Soft-delete an entity
    pub async fn delete(&self, kind: EntityKind, id: EntityId, actor: &ActingUser) -> Result<EntityRecord> {
        let start = Instant::now();
        let result = self
            .set_deleted(kind, id, actor, Action::Delete)
            .await;
        self.observe(kind, "delete", &result, start);
        result
    }

    /// Undo a soft delete
    pub async fn restore(&self, kind: EntityKind, id: EntityId, actor: &ActingUser) -> Result<EntityRecord> {
        let start = Instant::now();
        let result = self
            .set_deleted(kind, id, actor, Action::Restore)
            .await;
        self.observe(kind, "restore", &result, start);
        result
    }

    async fn set_deleted(
        &self,
        kind: EntityKind,
        id: EntityId,
        actor: &ActingUser,
        action: Action,
    ) -> Result<EntityRecord> {
        let mut tx = self.store.begin().await?;
        let before = Self::locked(tx.as_mut(), kind, id).await?;

        let (decision, label) = match action {
            Action::Delete => {
                if before.is_deleted() {
                    return Err(WorkflowError::EntityDeleted { kind, id });
                }
                (self.policy.can_delete(actor, &before), "deleted")
            }
            _ => (self.policy.can_restore(actor, &before), "restored"),
        };
        if !decision.allowed {
            return Err(WorkflowError::unauthorized(action.to_string(), decision.reason));
        }

        let mut after = before.next_version();
        after.deleted_at = match action {
            Action::Delete => Some(after.updated_at),
            _ => None,
        };

        tx.update(&after).await?;
        self.audit
            .record(tx.as_mut(), actor, label, Some(&before), Some(&after))
            .await?;
        tx.commit().await?;

        info!(kind = %kind, entity = %id, user = %actor.id, action = label, "Entity {}", label);
        Ok(after)
    }

    /// Remove an entity permanently. The audit trail keeps its history.
    pub async fn force_delete(&self, kind: EntityKind, id: EntityId, actor: &ActingUser) -> Result<()> {
        let start = Instant::now();
        let result = self.remove_entity(kind, id, actor).await;
        self.observe(kind, "force_delete", &result, start);
        result
    }

    async fn remove_entity(&self, kind: EntityKind, id: EntityId, actor: &ActingUser) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let before = Self::locked(tx.as_mut(), kind, id).await?;

        let decision = self.policy.can_force_delete(actor, &before);
        if !decision.allowed {
            return Err(WorkflowError::unauthorized("force_delete", decision.reason));
        }

        tx.remove(kind, id).await?;
        self.audit
            .record(tx.as_mut(), actor, "force_deleted", Some(&before), None)
            .await?;
        tx.commit().await?;

        warn!(kind = %kind, entity = %id, user = %actor.id, "Entity permanently deleted");
        Ok(())
    }

    /// Read one entity. Deleted entities are hidden from users who may not restore them.
    pub async fn get(&self, kind: EntityKind, id: EntityId, actor: &ActingUser) -> Result<EntityRecord> {
        let record = self
            .store
            .get(kind, id)
            .await?
            .ok_or(WorkflowError::NotFound { kind, id })?;

        if record.is_deleted() && !actor.can(Permission::RestoreRecords) {
            return Err(WorkflowError::NotFound { kind, id });
        }

        let decision = self.policy.can_view(actor, &record);
        if !decision.allowed {
            return Err(WorkflowError::unauthorized("view", decision.reason));
        }
        Ok(record)
    }

    /// Entities of a kind the actor may see.
    ///
    /// Holders of the kind's view permission see everything; owners of
    /// owner-visible kinds see their own records.
    pub async fn list(&self, kind: EntityKind, actor: &ActingUser) -> Result<Vec<EntityRecord>> {
        let decision = self.policy.can_view_any(actor, kind);
        let filter = match actor.member_id {
            _ if decision.allowed => ListFilter::default(),
            Some(member_id) if kind.owner_may_view() => ListFilter::owned_by(member_id),
            _ => return Err(WorkflowError::unauthorized("view", decision.reason)),
        };

        let records = self.store.list(kind, filter).await?;
        debug!(kind = %kind, user = %actor.id, count = records.len(), "Listed entities");
        Ok(records
            .into_iter()
            .filter(|r| self.policy.visible_in_list(actor, r))
            .collect())
    }

    /// Transitions the actor could take right now
    pub async fn available_transitions(
        &self,
        kind: EntityKind,
        id: EntityId,
        actor: &ActingUser,
    ) -> Result<Vec<Transition>> {
        let record = self.get(kind, id, actor).await?;
        Ok(self.transitions_for(&record, actor))
    }

    /// Transitions `actor` may execute on an already loaded record
    pub fn transitions_for(&self, record: &EntityRecord, actor: &ActingUser) -> Vec<Transition> {
        machine_for(record.kind)
            .outgoing(record.status)
            .filter(|e| self.policy.can_transition(actor, record, e.transition).allowed)
            .map(|e| e.transition)
            .collect()
    }

    /// Audit trail of one entity, oldest first
    pub async fn audit_trail(
        &self,
        kind: EntityKind,
        id: EntityId,
        actor: &ActingUser,
    ) -> Result<Vec<AuditEntry>> {
        if !actor.can(Permission::ViewAuditLogs) {
            return Err(WorkflowError::unauthorized(
                "view audit logs",
                "missing view_audit_logs",
            ));
        }
        self.store.audit_entries(&AuditQuery::for_entity(kind, id)).await
    }

    async fn locked(
        tx: &mut dyn StoreTransaction,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<EntityRecord> {
        tx.lock(kind, id)
            .await?
            .ok_or(WorkflowError::NotFound { kind, id })
    }

    /// Owner plus every role that can move the entity on from its new status
    fn recipients(&self, record: &EntityRecord, actor: &ActingUser) -> Vec<Recipient> {
        let mut recipients = BTreeSet::new();

        if let Some(owner) = &record.owner_user_id {
            if *owner != actor.id {
                recipients.insert(Recipient::User(owner.clone()));
            }
        }

        for edge in machine_for(record.kind)
            .outgoing(record.status)
            .filter(|e| e.guard.holds(record))
        {
            for permission in edge.any_of {
                for role in self.permissions.roles_with(*permission) {
                    recipients.insert(Recipient::Role(role));
                }
            }
        }

        recipients.into_iter().collect()
    }

    fn notify(&self, record: &EntityRecord, actor: &ActingUser, action: &str, from: Option<Status>) {
        let recipients = self.recipients(record, actor);
        let event = WorkflowEvent {
            kind: record.kind,
            entity_id: record.id,
            member_id: record.member_id,
            action: action.to_string(),
            from,
            to: record.status,
            actor: actor.id.clone(),
            at: Utc::now(),
        };
        // Delivery outcome is logged and counted by the dispatcher
        drop(self.dispatcher.dispatch(recipients, event));
    }

    fn observe<T>(&self, kind: EntityKind, operation: &str, result: &Result<T>, start: Instant) {
        let outcome = match result {
            Ok(_) => "committed",
            Err(e) => {
                if matches!(e, WorkflowError::Persistence(_)) {
                    warn!(kind = %kind, operation, error = %e, "Operation rolled back");
                } else {
                    debug!(kind = %kind, operation, error = %e, "Operation refused");
                }
                e.outcome()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_operation(kind.as_str(), operation, outcome, start.elapsed());
        }
    }
}
