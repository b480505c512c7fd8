//! Workflow orchestrator integration tests
//!
//! End-to-end flows through the in-memory store: approvals, refusals,
//! atomicity, soft deletion, listing and notifications.

mod common;

use common::*;
use cofund_core::{ActingUser, EntityKind, Permission, Status, Transition};
use cofund_workflow::{NewEntity, TransitionPayload, WorkflowError};
use uuid::Uuid;

// ============================================================================
// LOANS
// ============================================================================

#[tokio::test]
async fn test_loan_full_approval_chain() {
    let fx = fixture();
    let (_, member) = fx.active_member("amina").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    assert_eq!(loan.status, Status::Pending);

    let steps = [
        ("user:officer", "loan_officer", Transition::ApproveL1, Status::ApprovedL1),
        ("user:committee", "loan_committee", Transition::ApproveL2, Status::ApprovedL2),
        ("user:chair", "chairperson", Transition::ApproveL3, Status::ApprovedL3),
    ];
    for (id, role, transition, expected) in steps {
        let actor = fx.user(id, role);
        let updated = fx
            .orchestrator
            .execute(EntityKind::Loan, loan.id, transition, &actor, TransitionPayload::default())
            .await
            .unwrap();
        assert_eq!(updated.status, expected);
    }

    let treasurer = fx.user("user:treasurer", "treasurer");
    let disbursed = fx
        .orchestrator
        .execute(
            EntityKind::Loan,
            loan.id,
            Transition::Disburse,
            &treasurer,
            reference("MPESA-QX7781"),
        )
        .await
        .unwrap();

    assert_eq!(disbursed.status, Status::Disbursed);
    assert_eq!(disbursed.version, 5);
    assert_eq!(disbursed.history.len(), 4);
    assert_eq!(disbursed.history[3].by, "user:treasurer");
    assert_eq!(disbursed.history[3].reference.as_deref(), Some("MPESA-QX7781"));

    // created + four transitions
    assert_eq!(fx.audit_count(EntityKind::Loan, loan.id).await, 5);
}

#[tokio::test]
async fn test_reject_with_higher_level_only() {
    // A pending loan and an actor holding only approve_loans_l2
    let fx = fixture();
    let (_, member) = fx.active_member("baraka").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let committee = fx.user("user:committee", "loan_committee");

    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &committee, TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized(), "got {err:?}");

    let unchanged = fx.orchestrator.get(EntityKind::Loan, loan.id, &committee).await.unwrap();
    assert_eq!(unchanged.status, Status::Pending);
    assert_eq!(fx.audit_count(EntityKind::Loan, loan.id).await, 1);

    let rejected = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::Reject, &committee, note("insufficient savings"))
        .await
        .unwrap();
    assert_eq!(rejected.status, Status::Rejected);
    assert_eq!(rejected.history[0].note.as_deref(), Some("insufficient savings"));
}

#[tokio::test]
async fn test_reject_bar_follows_loan_stage() {
    let fx = fixture();
    let admin = fx.admin();
    let approver = |level: Permission| {
        ActingUser::new("user:approver")
            .with_role("approver")
            .with_permission(level)
    };

    // (approvals before rejecting, denied level, allowed level)
    let stages = [
        (vec![Transition::ApproveL1], Permission::DisburseLoans, Permission::ApproveLoansL1),
        (
            vec![Transition::ApproveL1, Transition::ApproveL2],
            Permission::ApproveLoansL1,
            Permission::ApproveLoansL2,
        ),
        (
            vec![Transition::ApproveL1, Transition::ApproveL2, Transition::ApproveL3],
            Permission::ApproveLoansL2,
            Permission::ApproveLoansL3,
        ),
    ];

    for (index, (approvals, below, at)) in stages.into_iter().enumerate() {
        let (_, member) = fx.active_member(&format!("rehema{index}")).await;
        let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
        for transition in approvals {
            fx.orchestrator
                .execute(EntityKind::Loan, loan.id, transition, &admin, TransitionPayload::default())
                .await
                .unwrap();
        }

        let err = fx
            .orchestrator
            .execute(EntityKind::Loan, loan.id, Transition::Reject, &approver(below), note("no"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized(), "{below} at stage {index}: {err:?}");

        let rejected = fx
            .orchestrator
            .execute(EntityKind::Loan, loan.id, Transition::Reject, &approver(at), note("no"))
            .await
            .unwrap();
        assert_eq!(rejected.status, Status::Rejected);
    }
}

#[tokio::test]
async fn test_skipping_a_level_is_invalid() {
    let fx = fixture();
    let (_, member) = fx.active_member("chausiku").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;

    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL2, &fx.admin(), TransitionPayload::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            kind: EntityKind::Loan,
            transition: Transition::ApproveL2,
            status: Status::Pending,
        }
    ));
    assert_eq!(fx.audit_count(EntityKind::Loan, loan.id).await, 1);
}

#[tokio::test]
async fn test_disburse_requires_reference() {
    let fx = fixture();
    let (_, member) = fx.active_member("daudi").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let admin = fx.admin();

    for t in [Transition::ApproveL1, Transition::ApproveL2, Transition::ApproveL3] {
        fx.orchestrator
            .execute(EntityKind::Loan, loan.id, t, &admin, TransitionPayload::default())
            .await
            .unwrap();
    }

    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::Disburse, &admin, TransitionPayload::default())
        .await
        .unwrap_err();
    match err {
        WorkflowError::Validation(fields) => assert_eq!(fields[0].field, "reference"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::Disburse, &admin, reference("bad ref"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn test_loan_edit_window() {
    let fx = fixture();
    let (_, member) = fx.active_member("eliya").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let admin = fx.admin();

    let mut details = loan_details();
    if let cofund_core::EntityDetails::Loan(d) = &mut details {
        d.amount = 300_000;
    }
    let updated = fx
        .orchestrator
        .update(EntityKind::Loan, loan.id, &admin, details.clone())
        .await
        .unwrap();
    assert_eq!(updated.details.amount(), Some(300_000));
    assert_eq!(updated.status, Status::Pending);

    fx.orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &admin, TransitionPayload::default())
        .await
        .unwrap();

    let err = fx
        .orchestrator
        .update(EntityKind::Loan, loan.id, &admin, details)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

// ============================================================================
// CONTRIBUTIONS, HEALTH CLAIMS, CASHOUTS, ENROLLMENTS
// ============================================================================

#[tokio::test]
async fn test_contribution_confirmed_once() {
    let fx = fixture();
    let (_, member) = fx.active_member("fatuma").await;
    let contribution = fx.submit(EntityKind::Contribution, &member, contribution_details()).await;
    assert_eq!(contribution.status, Status::Submitted);

    let treasurer = fx.user("user:treasurer", "treasurer");
    let verified = fx
        .orchestrator
        .execute(
            EntityKind::Contribution,
            contribution.id,
            Transition::Confirm,
            &treasurer,
            TransitionPayload::default(),
        )
        .await
        .unwrap();
    assert_eq!(verified.status, Status::Verified);

    let confirm_again = || {
        fx.orchestrator.execute(
            EntityKind::Contribution,
            contribution.id,
            Transition::Confirm,
            &treasurer,
            TransitionPayload::default(),
        )
    };

    let admin = fx.admin();
    let trail = fx
        .orchestrator
        .audit_trail(EntityKind::Contribution, contribution.id, &admin)
        .await
        .unwrap();

    let first = confirm_again().await.unwrap_err();
    assert!(first.is_invalid_transition(), "got {first:?}");

    // A refused call leaves nothing behind and refuses the same way again
    let second = confirm_again().await.unwrap_err();
    assert!(second.is_invalid_transition());
    assert_eq!(second.to_string(), first.to_string());

    let after = fx
        .orchestrator
        .audit_trail(EntityKind::Contribution, contribution.id, &admin)
        .await
        .unwrap();
    assert_eq!(after.len(), trail.len());

    let current = fx
        .orchestrator
        .get(EntityKind::Contribution, contribution.id, &admin)
        .await
        .unwrap();
    assert_eq!(current.status, Status::Verified);
    assert_eq!(current.version, verified.version);
}

#[tokio::test]
async fn test_reject_requires_note() {
    let fx = fixture();
    let (_, member) = fx.active_member("gerald").await;
    let contribution = fx.submit(EntityKind::Contribution, &member, contribution_details()).await;
    let treasurer = fx.user("user:treasurer", "treasurer");

    let err = fx
        .orchestrator
        .execute(
            EntityKind::Contribution,
            contribution.id,
            Transition::Reject,
            &treasurer,
            note("   "),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ref f) if f[0].field == "note"));
}

#[tokio::test]
async fn test_health_claim_paid() {
    let fx = fixture();
    let (_, member) = fx.active_member("halima").await;
    let claim = fx.submit(EntityKind::HealthClaim, &member, claim_details()).await;

    let officer = fx.user("user:health", "health_officer");
    let treasurer = fx.user("user:treasurer", "treasurer");

    // The officer may approve but not pay
    fx.orchestrator
        .execute(EntityKind::HealthClaim, claim.id, Transition::Approve, &officer, TransitionPayload::default())
        .await
        .unwrap();
    let err = fx
        .orchestrator
        .execute(EntityKind::HealthClaim, claim.id, Transition::Pay, &officer, reference("CHQ-001"))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let paid = fx
        .orchestrator
        .execute(EntityKind::HealthClaim, claim.id, Transition::Pay, &treasurer, reference("CHQ-001"))
        .await
        .unwrap();
    assert_eq!(paid.status, Status::Paid);
}

#[tokio::test]
async fn test_cashout_flow_and_owner_rights() {
    let fx = fixture();
    let (_, owner) = fx.active_member("idrisa").await;
    let (_, stranger) = fx.active_member("jabiri").await;
    let cashout = fx.submit(EntityKind::CashoutRequest, &owner, cashout_details()).await;

    // Owners may view their own cashout, other members may not
    assert!(fx.orchestrator.get(EntityKind::CashoutRequest, cashout.id, &owner).await.is_ok());
    let err = fx
        .orchestrator
        .get(EntityKind::CashoutRequest, cashout.id, &stranger)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let secretary = fx.user("user:secretary", "secretary");
    let chair = fx.user("user:chair", "chairperson");
    let treasurer = fx.user("user:treasurer", "treasurer");

    fx.orchestrator
        .execute(EntityKind::CashoutRequest, cashout.id, Transition::Verify, &secretary, TransitionPayload::default())
        .await
        .unwrap();

    // Verified cashouts can no longer be withdrawn by the owner
    assert!(fx
        .orchestrator
        .delete(EntityKind::CashoutRequest, cashout.id, &owner)
        .await
        .unwrap_err()
        .is_unauthorized());

    fx.orchestrator
        .execute(EntityKind::CashoutRequest, cashout.id, Transition::Approve, &chair, TransitionPayload::default())
        .await
        .unwrap();
    let done = fx
        .orchestrator
        .execute(EntityKind::CashoutRequest, cashout.id, Transition::Disburse, &treasurer, reference("BANK/2024/77"))
        .await
        .unwrap();
    assert_eq!(done.status, Status::Disbursed);
}

#[tokio::test]
async fn test_owner_withdraws_pending_cashout() {
    let fx = fixture();
    let (_, owner) = fx.active_member("kassim").await;
    let cashout = fx.submit(EntityKind::CashoutRequest, &owner, cashout_details()).await;

    let deleted = fx
        .orchestrator
        .delete(EntityKind::CashoutRequest, cashout.id, &owner)
        .await
        .unwrap();
    assert!(deleted.is_deleted());

    let err = fx
        .orchestrator
        .get(EntityKind::CashoutRequest, cashout.id, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn test_certificate_issued_exactly_once() {
    let fx = fixture();
    let (_, member) = fx.active_member("lulu").await;
    let enrollment = fx
        .submit(EntityKind::ProgramEnrollment, &member, enrollment_details())
        .await;
    assert_eq!(enrollment.status, Status::Enrolled);

    let coordinator = fx.user("user:pc", "program_coordinator");

    // No certificate before completion
    let err = fx
        .orchestrator
        .execute(
            EntityKind::ProgramEnrollment,
            enrollment.id,
            Transition::IssueCertificate,
            &coordinator,
            TransitionPayload::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    fx.orchestrator
        .execute(
            EntityKind::ProgramEnrollment,
            enrollment.id,
            Transition::MarkCompleted,
            &coordinator,
            TransitionPayload::default(),
        )
        .await
        .unwrap();

    let issued = fx
        .orchestrator
        .execute(
            EntityKind::ProgramEnrollment,
            enrollment.id,
            Transition::IssueCertificate,
            &coordinator,
            TransitionPayload::default(),
        )
        .await
        .unwrap();
    assert_eq!(issued.status, Status::Completed);
    let details = issued.details.as_enrollment().unwrap();
    assert!(details.certificate_issued);
    assert!(details.certificate_issued_at.is_some());

    let err = fx
        .orchestrator
        .execute(
            EntityKind::ProgramEnrollment,
            enrollment.id,
            Transition::IssueCertificate,
            &coordinator,
            TransitionPayload::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_certificate_cannot_be_set_directly() {
    let fx = fixture();
    let (_, member) = fx.active_member("mwajuma").await;

    let mut details = enrollment_details();
    if let Some(e) = details.as_enrollment_mut() {
        e.certificate_issued = true;
    }

    let err = fx
        .orchestrator
        .create(EntityKind::ProgramEnrollment, &member, NewEntity::new(details))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

// ============================================================================
// MEMBERS
// ============================================================================

#[tokio::test]
async fn test_member_lifecycle() {
    let fx = fixture();
    let (record, member) = fx.active_member("neema").await;
    assert_eq!(record.status, Status::Active);
    assert_eq!(record.owner_user_id.as_deref(), Some("user:neema"));

    // Members see their own record without view_members
    assert!(fx.orchestrator.get(EntityKind::Member, record.id, &member).await.is_ok());

    let chair = fx.user("user:chair", "chairperson");
    let err = fx
        .orchestrator
        .execute(EntityKind::Member, record.id, Transition::Suspend, &chair, TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    fx.orchestrator
        .execute(EntityKind::Member, record.id, Transition::Suspend, &chair, note("arrears"))
        .await
        .unwrap();

    // Suspended members cannot open new requests
    let err = fx
        .orchestrator
        .create(EntityKind::Loan, &member, NewEntity::new(loan_details()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ref f) if f[0].field == "member_id"));

    let active = fx
        .orchestrator
        .execute(EntityKind::Member, record.id, Transition::Reinstate, &chair, TransitionPayload::default())
        .await
        .unwrap();
    assert_eq!(active.status, Status::Active);
}

#[tokio::test]
async fn test_invalid_details_store_nothing() {
    let fx = fixture();
    let (_, member) = fx.active_member("omari").await;

    let mut details = contribution_details();
    if let cofund_core::EntityDetails::Contribution(c) = &mut details {
        c.period = "May 2024".into();
        c.amount = 0;
    }

    let err = fx
        .orchestrator
        .create(EntityKind::Contribution, &member, NewEntity::new(details))
        .await
        .unwrap_err();
    match err {
        WorkflowError::Validation(fields) => {
            let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["amount", "period"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let treasurer = fx.user("user:treasurer", "treasurer");
    assert!(fx
        .orchestrator
        .list(EntityKind::Contribution, &treasurer)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_create_for_unknown_member() {
    let fx = fixture();
    let admin = fx.admin();

    let err = fx
        .orchestrator
        .create(EntityKind::Loan, &admin, NewEntity::new(loan_details()).for_member(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ref f) if f[0].field == "member_id"));

    let err = fx
        .orchestrator
        .create(EntityKind::Loan, &admin, NewEntity::new(loan_details()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

// ============================================================================
// ATOMICITY
// ============================================================================

#[tokio::test]
async fn test_failed_audit_write_rolls_back() {
    let (fx, failing) = failing_fixture();
    let (_, member) = fx.active_member("pendo").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let officer = fx.user("user:officer", "loan_officer");

    failing.fail_audit_writes(true);
    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &officer, TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Persistence(_)));

    failing.fail_audit_writes(false);
    let current = fx.orchestrator.get(EntityKind::Loan, loan.id, &officer).await.unwrap();
    assert_eq!(current.status, Status::Pending);
    assert_eq!(current.version, loan.version);
    assert_eq!(fx.audit_count(EntityKind::Loan, loan.id).await, 1);

    // The same transition goes through once the store recovers
    let approved = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &officer, TransitionPayload::default())
        .await
        .unwrap();
    assert_eq!(approved.status, Status::ApprovedL1);
}

#[tokio::test]
async fn test_failed_create_leaves_nothing() {
    let (fx, failing) = failing_fixture();
    let (_, member) = fx.active_member("rehema").await;

    failing.fail_audit_writes(true);
    let err = fx
        .orchestrator
        .create(EntityKind::CashoutRequest, &member, NewEntity::new(cashout_details()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Persistence(_)));
    failing.fail_audit_writes(false);

    assert!(fx
        .orchestrator
        .list(EntityKind::CashoutRequest, &member)
        .await
        .unwrap()
        .is_empty());
}

// ============================================================================
// SOFT DELETION
// ============================================================================

#[tokio::test]
async fn test_soft_delete_restore_and_force_delete() {
    let fx = fixture();
    let (_, member) = fx.active_member("saida").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let admin = fx.admin();
    let officer = fx.user("user:officer", "loan_officer");

    fx.orchestrator.delete(EntityKind::Loan, loan.id, &admin).await.unwrap();

    let err = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &admin, TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EntityDeleted { .. }));
    assert!(err.is_invalid_transition());

    // Hidden from users who cannot restore
    let err = fx.orchestrator.get(EntityKind::Loan, loan.id, &officer).await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
    assert!(fx.orchestrator.list(EntityKind::Loan, &officer).await.unwrap().is_empty());

    // Restoring needs restore_records
    assert!(fx
        .orchestrator
        .restore(EntityKind::Loan, loan.id, &officer)
        .await
        .unwrap_err()
        .is_unauthorized());
    let restored = fx.orchestrator.restore(EntityKind::Loan, loan.id, &admin).await.unwrap();
    assert!(!restored.is_deleted());

    fx.orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &officer, TransitionPayload::default())
        .await
        .unwrap();

    fx.orchestrator.force_delete(EntityKind::Loan, loan.id, &admin).await.unwrap();
    let err = fx.orchestrator.get(EntityKind::Loan, loan.id, &admin).await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));

    // The trail outlives the entity
    let trail = fx.orchestrator.audit_trail(EntityKind::Loan, loan.id, &admin).await.unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["created", "deleted", "restored", "approve_l1", "force_deleted"]);
    assert_eq!(trail[3].before_status(), Some(Status::Pending));
    assert_eq!(trail[3].after_status(), Some(Status::ApprovedL1));
    assert!(trail[4].after.is_none());
}

#[tokio::test]
async fn test_audit_trail_needs_permission() {
    let fx = fixture();
    let (record, member) = fx.active_member("tatu").await;

    let err = fx
        .orchestrator
        .audit_trail(EntityKind::Member, record.id, &member)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let chair = fx.user("user:chair", "chairperson");
    let trail = fx.orchestrator.audit_trail(EntityKind::Member, record.id, &chair).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].user_id, "user:tatu");
    assert_eq!(trail[1].user_id, "user:secretary");
}

// ============================================================================
// LISTING AND AVAILABLE TRANSITIONS
// ============================================================================

#[tokio::test]
async fn test_listing_visibility() {
    let fx = fixture();
    let (_, a) = fx.active_member("upendo").await;
    let (_, b) = fx.active_member("vumilia").await;
    fx.submit(EntityKind::CashoutRequest, &a, cashout_details()).await;
    fx.submit(EntityKind::CashoutRequest, &b, cashout_details()).await;
    fx.submit(EntityKind::Loan, &a, loan_details()).await;

    let own = fx.orchestrator.list(EntityKind::CashoutRequest, &a).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(Some(own[0].member_id), a.member_id);

    // No owner carve-out for loans
    assert!(fx.orchestrator.list(EntityKind::Loan, &a).await.unwrap_err().is_unauthorized());

    let treasurer = fx.user("user:treasurer", "treasurer");
    assert_eq!(fx.orchestrator.list(EntityKind::CashoutRequest, &treasurer).await.unwrap().len(), 2);
    assert_eq!(fx.orchestrator.list(EntityKind::Loan, &treasurer).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_available_transitions() {
    let fx = fixture();
    let (_, member) = fx.active_member("wema").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;

    let officer = fx.user("user:officer", "loan_officer");
    let treasurer = fx.user("user:treasurer", "treasurer");

    assert_eq!(
        fx.orchestrator.available_transitions(EntityKind::Loan, loan.id, &officer).await.unwrap(),
        vec![Transition::ApproveL1, Transition::Reject]
    );
    assert!(fx
        .orchestrator
        .available_transitions(EntityKind::Loan, loan.id, &treasurer)
        .await
        .unwrap()
        .is_empty());
}

// ============================================================================
// NOTIFICATIONS AND METRICS
// ============================================================================

#[tokio::test]
async fn test_next_approvers_and_owner_are_notified() {
    let fx = fixture();
    let (_, member) = fx.active_member("xavier").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let officer = fx.user("user:officer", "loan_officer");

    fx.orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &officer, TransitionPayload::default())
        .await
        .unwrap();

    // One each for the loan submission and the first approval
    let committee = fx.user("user:committee", "loan_committee");
    assert!(fx.wait_for_notifications(&committee, 2).await);

    // Membership approval, then the loan approval; not the member's own submission
    assert!(fx.wait_for_notifications(&member, 2).await);

    let latest = fx.inbox.notifications_for(&committee).pop().unwrap();
    assert_eq!(latest.event.to, Status::ApprovedL1);
    assert_eq!(latest.event.action, "approve_l1");
}

#[tokio::test]
async fn test_operations_are_counted() {
    let fx = fixture();
    let (_, member) = fx.active_member("yusuf").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;
    let nobody = ActingUser::new("user:nobody").with_permission(Permission::ViewLoans);

    let _ = fx
        .orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &nobody, TransitionPayload::default())
        .await;
    fx.orchestrator
        .execute(EntityKind::Loan, loan.id, Transition::ApproveL1, &fx.admin(), TransitionPayload::default())
        .await
        .unwrap();

    let metrics = fx.orchestrator.metrics().unwrap();
    assert_eq!(metrics.operations_total("loan", "approve_l1", "unauthorized"), 1);
    assert_eq!(metrics.operations_total("loan", "approve_l1", "committed"), 1);
    assert_eq!(metrics.operations_total("loan", "create", "committed"), 1);
}
