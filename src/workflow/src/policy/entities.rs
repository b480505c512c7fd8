//! Named decision functions per entity kind
//!
//! Thin views over [`PolicyEngine`]; the rule tables and state machines stay
//! the single source of truth.

use super::PolicyEngine;
use crate::types::EntityRecord;
use cofund_core::{ActingUser, EntityKind, MemberId, Transition};

macro_rules! entity_policy {
    (
        $(#[$meta:meta])*
        $name:ident($kind:ident) {
            $($method:ident => $transition:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a>(pub(super) &'a PolicyEngine);

        impl<'a> $name<'a> {
            pub fn view_any(&self, actor: &ActingUser) -> bool {
                self.0.can_view_any(actor, EntityKind::$kind).allowed
            }

            pub fn view(&self, actor: &ActingUser, record: &EntityRecord) -> bool {
                self.0.can_view(actor, record).allowed
            }

            pub fn create(&self, actor: &ActingUser, member: Option<MemberId>) -> bool {
                self.0.can_create(actor, EntityKind::$kind, member).allowed
            }

            pub fn update(&self, actor: &ActingUser, record: &EntityRecord) -> bool {
                self.0.can_update(actor, record).allowed
            }

            pub fn delete(&self, actor: &ActingUser, record: &EntityRecord) -> bool {
                self.0.can_delete(actor, record).allowed
            }

            $(
                pub fn $method(&self, actor: &ActingUser, record: &EntityRecord) -> bool {
                    self.0.can_transition(actor, record, Transition::$transition).allowed
                }
            )*
        }
    };
}

entity_policy! {
    /// Member registration and standing
    MemberPolicy(Member) {
        approve => Approve,
        suspend => Suspend,
        reinstate => Reinstate,
    }
}

entity_policy! {
    ContributionPolicy(Contribution) {
        confirm => Confirm,
        reject => Reject,
    }
}

entity_policy! {
    /// Three approval levels, then disbursement
    LoanPolicy(Loan) {
        approve_l1 => ApproveL1,
        approve_l2 => ApproveL2,
        approve_l3 => ApproveL3,
        disburse => Disburse,
        reject => Reject,
    }
}

entity_policy! {
    HealthClaimPolicy(HealthClaim) {
        approve => Approve,
        pay => Pay,
        reject => Reject,
    }
}

entity_policy! {
    CashoutPolicy(CashoutRequest) {
        verify => Verify,
        approve => Approve,
        disburse => Disburse,
        reject => Reject,
    }
}

entity_policy! {
    /// Enrolling is `create`; completion and certificates are transitions
    EnrollmentPolicy(ProgramEnrollment) {
        mark_completed => MarkCompleted,
        mark_dropped => MarkDropped,
        issue_certificate => IssueCertificate,
    }
}

impl EnrollmentPolicy<'_> {
    pub fn enroll(&self, actor: &ActingUser, member: Option<MemberId>) -> bool {
        self.create(actor, member)
    }
}
