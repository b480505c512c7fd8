//! Shared fixtures for workflow integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cofund_core::types::{
    CashoutDetails, ContributionDetails, EnrollmentDetails, HealthClaimDetails, LoanDetails,
    MemberDetails,
};
use cofund_core::{ActingUser, EntityDetails, EntityId, EntityKind, Transition};
use cofund_workflow::audit::{AuditEntry, AuditQuery};
use cofund_workflow::store::{ListFilter, StoreTransaction, WorkflowStore};
use cofund_workflow::{
    EngineConfig, EntityRecord, InAppNotifier, InMemoryStore, NewEntity, PermissionSource,
    Result, StaticRolePermissions, TransitionPayload, WorkflowError, WorkflowOrchestrator,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct Fixture {
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub store: InMemoryStore,
    pub inbox: Arc<InAppNotifier>,
    pub roles: Arc<StaticRolePermissions>,
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        notify_max_attempts: 2,
        notify_backoff: Duration::from_millis(1),
        enable_metrics: true,
    }
}

pub fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    fixture_with_backend(store.clone(), Arc::new(store))
}

/// Fixture whose orchestrator writes through `backend`; `store` is the
/// in-memory store underneath it, used for assertions
fn fixture_with_backend(store: InMemoryStore, backend: Arc<dyn WorkflowStore>) -> Fixture {
    let inbox = Arc::new(InAppNotifier::new());
    let roles = Arc::new(StaticRolePermissions::with_default_roles());

    let orchestrator =
        WorkflowOrchestrator::new(test_config(), backend, roles.clone(), inbox.clone()).unwrap();

    Fixture {
        orchestrator: Arc::new(orchestrator),
        store,
        inbox,
        roles,
    }
}

/// Fixture whose store can be told to fail audit writes
pub fn failing_fixture() -> (Fixture, Arc<FailingAuditStore>) {
    let store = InMemoryStore::new();
    let failing = Arc::new(FailingAuditStore::new(store.clone()));
    (fixture_with_backend(store, failing.clone()), failing)
}

impl Fixture {
    /// Acting user with a default role
    pub fn user(&self, id: &str, role: &str) -> ActingUser {
        self.roles.resolve(id.to_string(), Some(role), None)
    }

    pub fn admin(&self) -> ActingUser {
        self.user("user:admin", "admin")
    }

    /// Self-register and approve a member; returns the record and its user
    pub async fn active_member(&self, name: &str) -> (EntityRecord, ActingUser) {
        let user_id = format!("user:{}", name);
        let newcomer = ActingUser::new(user_id.clone());

        let record = self
            .orchestrator
            .create(EntityKind::Member, &newcomer, NewEntity::new(member_details(name)))
            .await
            .unwrap();

        let secretary = self.user("user:secretary", "secretary");
        let record = self
            .orchestrator
            .execute(
                EntityKind::Member,
                record.id,
                Transition::Approve,
                &secretary,
                TransitionPayload::default(),
            )
            .await
            .unwrap();

        let member_user = self
            .roles
            .resolve(user_id, Some("member"), Some(record.id));
        (record, member_user)
    }

    /// Create an entity as the given member
    pub async fn submit(
        &self,
        kind: EntityKind,
        member: &ActingUser,
        details: EntityDetails,
    ) -> EntityRecord {
        self.orchestrator
            .create(kind, member, NewEntity::new(details))
            .await
            .unwrap()
    }

    pub async fn audit_count(&self, kind: EntityKind, id: EntityId) -> usize {
        self.store
            .audit_entries(&AuditQuery::for_entity(kind, id))
            .await
            .unwrap()
            .len()
    }

    /// Poll the inbox until `user` has at least `count` notifications
    pub async fn wait_for_notifications(&self, user: &ActingUser, count: usize) -> bool {
        for _ in 0..100 {
            if self.inbox.notifications_for(user).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn note(text: &str) -> TransitionPayload {
    TransitionPayload::default().with_note(text)
}

pub fn reference(text: &str) -> TransitionPayload {
    TransitionPayload::default().with_reference(text)
}

pub fn member_details(name: &str) -> EntityDetails {
    EntityDetails::Member(MemberDetails {
        full_name: name.to_string(),
        phone: "+255700000000".to_string(),
        email: None,
        national_id: None,
    })
}

pub fn contribution_details() -> EntityDetails {
    EntityDetails::Contribution(ContributionDetails {
        amount: 10_000,
        fine_amount: 0,
        period: "2024-05".to_string(),
        receipt_ref: "RCPT-2024-05-001".to_string(),
    })
}

pub fn loan_details() -> EntityDetails {
    EntityDetails::Loan(LoanDetails {
        amount: 250_000,
        term_months: 12,
        purpose: "Expand market stall".to_string(),
    })
}

pub fn claim_details() -> EntityDetails {
    EntityDetails::HealthClaim(HealthClaimDetails {
        amount: 45_000,
        hospital: "Mnazi Mmoja Hospital".to_string(),
        description: "Outpatient treatment".to_string(),
    })
}

pub fn cashout_details() -> EntityDetails {
    EntityDetails::CashoutRequest(CashoutDetails {
        amount: 60_000,
        reason: "School fees".to_string(),
    })
}

pub fn enrollment_details() -> EntityDetails {
    EntityDetails::ProgramEnrollment(EnrollmentDetails {
        program_id: Uuid::new_v4(),
        program_name: "Financial literacy".to_string(),
        certificate_issued: false,
        certificate_issued_at: None,
    })
}

/// Store wrapper that fails every audit append once armed
pub struct FailingAuditStore {
    inner: InMemoryStore,
    armed: Arc<AtomicBool>,
}

impl FailingAuditStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_audit_writes(&self, fail: bool) {
        self.armed.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkflowStore for FailingAuditStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            armed: self.armed.clone(),
        }))
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>> {
        self.inner.get(kind, id).await
    }

    async fn list(&self, kind: EntityKind, filter: ListFilter) -> Result<Vec<EntityRecord>> {
        self.inner.list(kind, filter).await
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        self.inner.audit_entries(query).await
    }
}

struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    armed: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn lock(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>> {
        self.inner.lock(kind, id).await
    }

    async fn insert(&mut self, record: &EntityRecord) -> Result<()> {
        self.inner.insert(record).await
    }

    async fn update(&mut self, record: &EntityRecord) -> Result<()> {
        self.inner.update(record).await
    }

    async fn remove(&mut self, kind: EntityKind, id: EntityId) -> Result<()> {
        self.inner.remove(kind, id).await
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) {
            return Err(WorkflowError::Persistence("audit log unavailable".into()));
        }
        self.inner.append_audit(entry).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }
}
