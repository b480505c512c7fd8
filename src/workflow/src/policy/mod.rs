//! Policy engine
//!
//! Every decision is `permission AND guard`. Guards are the entity's status,
//! ownership for the few owner-gated actions, and soft deletion. Transition
//! decisions read the qualifying permissions off the state machine edge.

mod entities;

pub use entities::{
    CashoutPolicy, ContributionPolicy, EnrollmentPolicy, HealthClaimPolicy, LoanPolicy,
    MemberPolicy,
};

use crate::machine::machine_for;
use crate::types::{Action, Decision, EntityRecord};
use cofund_core::{ActingUser, EntityKind, MemberId, Permission, Status, Transition};
use tracing::debug;

/// Who may update or delete a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationRule {
    /// Holders of the permission
    Permission(Permission),
    /// The owning member, without any permission
    Owner,
}

/// Non-transition rules of one entity kind
#[derive(Debug)]
pub struct KindRules {
    pub kind: EntityKind,
    pub view: Permission,
    pub create: Permission,
    pub update: MutationRule,
    pub delete: MutationRule,
    /// Statuses in which details may be updated
    pub editable: &'static [Status],
    /// Statuses in which the record may be soft-deleted
    pub deletable: &'static [Status],
}

static RULES: [KindRules; 6] = [
    KindRules {
        kind: EntityKind::Member,
        view: Permission::ViewMembers,
        create: Permission::CreateMembers,
        update: MutationRule::Permission(Permission::UpdateMembers),
        delete: MutationRule::Permission(Permission::DeleteMembers),
        editable: &[Status::PreRegistered, Status::Active, Status::Suspended],
        deletable: &[Status::PreRegistered],
    },
    KindRules {
        kind: EntityKind::Contribution,
        view: Permission::ViewContributions,
        create: Permission::CreateContributions,
        update: MutationRule::Permission(Permission::UpdateContributions),
        delete: MutationRule::Permission(Permission::DeleteContributions),
        editable: &[Status::Submitted],
        deletable: &[Status::Submitted],
    },
    KindRules {
        kind: EntityKind::Loan,
        view: Permission::ViewLoans,
        create: Permission::CreateLoans,
        update: MutationRule::Permission(Permission::UpdateLoans),
        delete: MutationRule::Permission(Permission::DeleteLoans),
        editable: &[Status::Pending],
        deletable: &[Status::Pending],
    },
    KindRules {
        kind: EntityKind::HealthClaim,
        view: Permission::ViewHealthClaims,
        create: Permission::CreateHealthClaims,
        update: MutationRule::Permission(Permission::UpdateHealthClaims),
        delete: MutationRule::Permission(Permission::DeleteHealthClaims),
        editable: &[Status::Submitted],
        deletable: &[Status::Submitted],
    },
    KindRules {
        kind: EntityKind::CashoutRequest,
        view: Permission::ViewCashouts,
        create: Permission::CreateCashouts,
        update: MutationRule::Owner,
        delete: MutationRule::Owner,
        editable: &[Status::Pending],
        deletable: &[Status::Pending],
    },
    KindRules {
        kind: EntityKind::ProgramEnrollment,
        view: Permission::ViewEnrollments,
        create: Permission::EnrollPrograms,
        update: MutationRule::Permission(Permission::UpdateEnrollments),
        delete: MutationRule::Permission(Permission::DeleteEnrollments),
        editable: &[Status::Enrolled],
        deletable: &[Status::Enrolled],
    },
];

/// Rules for a kind
pub fn rules_for(kind: EntityKind) -> &'static KindRules {
    match kind {
        EntityKind::Member => &RULES[0],
        EntityKind::Contribution => &RULES[1],
        EntityKind::Loan => &RULES[2],
        EntityKind::HealthClaim => &RULES[3],
        EntityKind::CashoutRequest => &RULES[4],
        EntityKind::ProgramEnrollment => &RULES[5],
    }
}

/// Stateless decision functions over the actor and the entity
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decide any action. Record actions without a record are denied.
    pub fn decide(
        &self,
        actor: &ActingUser,
        action: Action,
        kind: EntityKind,
        record: Option<&EntityRecord>,
    ) -> Decision {
        let decision = match (action, record) {
            (Action::ViewAny, _) => self.can_view_any(actor, kind),
            (Action::Create, target) => {
                self.can_create(actor, kind, target.map(|r| r.member_id))
            }
            (Action::View, Some(r)) => self.can_view(actor, r),
            (Action::Update, Some(r)) => self.can_update(actor, r),
            (Action::Delete, Some(r)) => self.can_delete(actor, r),
            (Action::Restore, Some(r)) => self.can_restore(actor, r),
            (Action::ForceDelete, Some(r)) => self.can_force_delete(actor, r),
            (Action::Transition(t), Some(r)) => self.can_transition(actor, r, t),
            (action, None) => Decision::deny(action, format!("{} needs an existing {}", action, kind)),
        };

        debug!(
            user = %actor.id,
            kind = %kind,
            action = %action,
            allowed = decision.allowed,
            reason = %decision.reason,
            "Policy decision"
        );

        decision
    }

    /// List every record of a kind
    pub fn can_view_any(&self, actor: &ActingUser, kind: EntityKind) -> Decision {
        let rules = rules_for(kind);
        if actor.can(rules.view) {
            Decision::allow(Action::ViewAny, format!("holds {}", rules.view))
        } else {
            Decision::deny(Action::ViewAny, format!("missing {}", rules.view))
        }
    }

    pub fn can_view(&self, actor: &ActingUser, record: &EntityRecord) -> Decision {
        let rules = rules_for(record.kind);

        if record.is_deleted() {
            return if actor.can(rules.view) && actor.can(Permission::RestoreRecords) {
                Decision::allow(Action::View, "may view deleted records")
            } else {
                Decision::deny(Action::View, "record is deleted")
            };
        }

        if actor.can(rules.view) {
            Decision::allow(Action::View, format!("holds {}", rules.view))
        } else if record.kind.owner_may_view() && actor.owns(record.member_id) {
            Decision::allow(Action::View, "owner of the record")
        } else {
            Decision::deny(Action::View, format!("missing {}", rules.view))
        }
    }

    /// Create a record owned by `target_member`. Members are never owned
    /// by another member, so the target is ignored for them.
    pub fn can_create(
        &self,
        actor: &ActingUser,
        kind: EntityKind,
        target_member: Option<MemberId>,
    ) -> Decision {
        let rules = rules_for(kind);

        if kind == EntityKind::Member {
            return if actor.can(rules.create) {
                Decision::allow(Action::Create, format!("holds {}", rules.create))
            } else if actor.member_id.is_none() {
                Decision::allow(Action::Create, "self-registration")
            } else {
                Decision::deny(Action::Create, "already linked to a member")
            };
        }

        if !actor.can(rules.create) {
            return Decision::deny(Action::Create, format!("missing {}", rules.create));
        }

        match target_member {
            Some(member) if actor.owns(member) => {
                Decision::allow(Action::Create, format!("holds {} for own member", rules.create))
            }
            Some(_) if actor.can(rules.view) => Decision::allow(
                Action::Create,
                format!("holds {} and {}", rules.create, rules.view),
            ),
            Some(_) => Decision::deny(
                Action::Create,
                format!("creating for another member needs {}", rules.view),
            ),
            None => Decision::deny(Action::Create, "no owning member"),
        }
    }

    pub fn can_update(&self, actor: &ActingUser, record: &EntityRecord) -> Decision {
        let rules = rules_for(record.kind);
        self.mutation(actor, record, Action::Update, rules.update, rules.editable)
    }

    pub fn can_delete(&self, actor: &ActingUser, record: &EntityRecord) -> Decision {
        let rules = rules_for(record.kind);
        self.mutation(actor, record, Action::Delete, rules.delete, rules.deletable)
    }

    pub fn can_restore(&self, actor: &ActingUser, record: &EntityRecord) -> Decision {
        if !actor.can(Permission::RestoreRecords) {
            Decision::deny(Action::Restore, "missing restore_records")
        } else if !record.is_deleted() {
            Decision::deny(Action::Restore, "record is not deleted")
        } else {
            Decision::allow(Action::Restore, "holds restore_records")
        }
    }

    pub fn can_force_delete(&self, actor: &ActingUser, _record: &EntityRecord) -> Decision {
        if actor.can(Permission::ForceDeleteRecords) {
            Decision::allow(Action::ForceDelete, "holds force_delete_records")
        } else {
            Decision::deny(Action::ForceDelete, "missing force_delete_records")
        }
    }

    /// Take the named transition: a matching edge out of the current
    /// status whose guard holds, and any one of its permissions
    pub fn can_transition(
        &self,
        actor: &ActingUser,
        record: &EntityRecord,
        transition: Transition,
    ) -> Decision {
        let action = Action::Transition(transition);

        if record.is_deleted() {
            return Decision::deny(action, "record is deleted");
        }

        let Some(edge) = machine_for(record.kind).admits(record, transition) else {
            return Decision::deny(
                action,
                format!("no {} edge from {}", transition, record.status),
            );
        };

        match edge.any_of.iter().find(|p| actor.can(**p)) {
            Some(permission) => Decision::allow(action, format!("holds {}", permission)),
            None => Decision::deny(
                action,
                format!(
                    "needs one of: {}",
                    edge.any_of
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
        }
    }

    /// Whether a listed record is shown to the actor
    pub fn visible_in_list(&self, actor: &ActingUser, record: &EntityRecord) -> bool {
        self.can_view(actor, record).allowed
    }

    pub fn member(&self) -> MemberPolicy<'_> {
        MemberPolicy(self)
    }

    pub fn contribution(&self) -> ContributionPolicy<'_> {
        ContributionPolicy(self)
    }

    pub fn loan(&self) -> LoanPolicy<'_> {
        LoanPolicy(self)
    }

    pub fn health_claim(&self) -> HealthClaimPolicy<'_> {
        HealthClaimPolicy(self)
    }

    pub fn cashout(&self) -> CashoutPolicy<'_> {
        CashoutPolicy(self)
    }

    pub fn enrollment(&self) -> EnrollmentPolicy<'_> {
        EnrollmentPolicy(self)
    }

    fn mutation(
        &self,
        actor: &ActingUser,
        record: &EntityRecord,
        action: Action,
        rule: MutationRule,
        statuses: &[Status],
    ) -> Decision {
        if record.is_deleted() {
            return Decision::deny(action, "record is deleted");
        }

        let permitted = match rule {
            MutationRule::Permission(p) => actor.can(p),
            MutationRule::Owner => actor.owns(record.member_id),
        };
        if !permitted {
            let reason = match rule {
                MutationRule::Permission(p) => format!("missing {}", p),
                MutationRule::Owner => "only the owner may do this".to_string(),
            };
            return Decision::deny(action, reason);
        }

        if statuses.contains(&record.status) {
            Decision::allow(action, format!("allowed while {}", record.status))
        } else {
            Decision::deny(action, format!("not allowed while {}", record.status))
        }
    }
}
