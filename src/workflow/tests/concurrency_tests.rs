//! Concurrent transitions on the same entity

mod common;

use common::*;
use cofund_core::{EntityKind, Status, Transition};
use cofund_workflow::audit::AuditQuery;
use cofund_workflow::store::WorkflowStore;
use cofund_workflow::TransitionPayload;

#[tokio::test]
async fn test_racing_approvals_commit_once() {
    let fx = fixture();
    let (_, member) = fx.active_member("zawadi").await;
    let loan = fx.submit(EntityKind::Loan, &member, loan_details()).await;

    let first = fx.user("user:officer-a", "loan_officer");
    let second = fx.user("user:officer-b", "loan_officer");

    let (a, b) = tokio::join!(
        fx.orchestrator.execute(
            EntityKind::Loan,
            loan.id,
            Transition::ApproveL1,
            &first,
            TransitionPayload::default()
        ),
        fx.orchestrator.execute(
            EntityKind::Loan,
            loan.id,
            Transition::ApproveL1,
            &second,
            TransitionPayload::default()
        ),
    );

    let results = [a, b];
    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);

    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(loser.is_invalid_transition(), "got {loser:?}");

    let approvals = fx
        .store
        .audit_entries(&AuditQuery::for_entity(EntityKind::Loan, loan.id))
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == "approve_l1")
        .count();
    assert_eq!(approvals, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_tasks_one_winner() {
    let fx = fixture();
    let (_, member) = fx.active_member("imani").await;
    let cashout = fx.submit(EntityKind::CashoutRequest, &member, cashout_details()).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let orchestrator = fx.orchestrator.clone();
        let actor = fx.user(&format!("user:secretary-{i}"), "secretary");
        let id = cashout.id;
        handles.push(tokio::spawn(async move {
            orchestrator
                .execute(
                    EntityKind::CashoutRequest,
                    id,
                    Transition::Verify,
                    &actor,
                    TransitionPayload::default(),
                )
                .await
        }));
    }

    let mut committed = 0;
    for handle in futures::future::join_all(handles).await {
        match handle.unwrap() {
            Ok(record) => {
                committed += 1;
                assert_eq!(record.status, Status::Verified);
                assert_eq!(record.version, 2);
            }
            Err(e) => assert!(e.is_invalid_transition(), "got {e:?}"),
        }
    }
    assert_eq!(committed, 1);

    // created + one verify
    assert_eq!(fx.audit_count(EntityKind::CashoutRequest, cashout.id).await, 2);
}

#[tokio::test]
async fn test_transitions_on_different_entities_do_not_interfere() {
    let fx = fixture();
    let (_, member) = fx.active_member("kheri").await;
    let first = fx.submit(EntityKind::Contribution, &member, contribution_details()).await;
    let second = fx.submit(EntityKind::Contribution, &member, contribution_details()).await;
    let treasurer = fx.user("user:treasurer", "treasurer");

    let (a, b) = tokio::join!(
        fx.orchestrator.execute(
            EntityKind::Contribution,
            first.id,
            Transition::Confirm,
            &treasurer,
            TransitionPayload::default()
        ),
        fx.orchestrator.execute(
            EntityKind::Contribution,
            second.id,
            Transition::Reject,
            &treasurer,
            note("receipt unreadable")
        ),
    );

    assert_eq!(a.unwrap().status, Status::Verified);
    assert_eq!(b.unwrap().status, Status::Rejected);
}
