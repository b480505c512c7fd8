use super::{Edge, Effect, Guard, Machine};
use cofund_core::{EntityKind, Permission as P, Status as S, Transition as T};

pub(super) static MEMBER: Machine = Machine {
    kind: EntityKind::Member,
    initial: S::PreRegistered,
    statuses: &[S::PreRegistered, S::Active, S::Suspended],
    terminal: &[],
    edges: &[
        Edge::new(T::Approve, S::PreRegistered, S::Active, &[P::ApproveMembers]),
        Edge::new(T::Suspend, S::Active, S::Suspended, &[P::SuspendMembers]).requires_note(),
        Edge::new(T::Reinstate, S::Suspended, S::Active, &[P::SuspendMembers]),
    ],
};

pub(super) static CONTRIBUTION: Machine = Machine {
    kind: EntityKind::Contribution,
    initial: S::Submitted,
    statuses: &[S::Submitted, S::Verified, S::Rejected],
    terminal: &[S::Verified, S::Rejected],
    edges: &[
        Edge::new(T::Confirm, S::Submitted, S::Verified, &[P::ConfirmContributions]),
        Edge::new(
            T::Reject,
            S::Submitted,
            S::Rejected,
            &[P::ConfirmContributions, P::RejectContributions],
        )
        .requires_note(),
    ],
};

pub(super) static LOAN: Machine = Machine {
    kind: EntityKind::Loan,
    initial: S::Pending,
    statuses: &[
        S::Pending,
        S::ApprovedL1,
        S::ApprovedL2,
        S::ApprovedL3,
        S::Disbursed,
        S::Rejected,
    ],
    terminal: &[S::Disbursed, S::Rejected],
    edges: &[
        Edge::new(T::ApproveL1, S::Pending, S::ApprovedL1, &[P::ApproveLoansL1]),
        Edge::new(T::ApproveL2, S::ApprovedL1, S::ApprovedL2, &[P::ApproveLoansL2]),
        Edge::new(T::ApproveL3, S::ApprovedL2, S::ApprovedL3, &[P::ApproveLoansL3]),
        Edge::new(T::Disburse, S::ApprovedL3, S::Disbursed, &[P::DisburseLoans]).requires_reference(),
        // Rejecting needs an approval level at or above the current stage
        Edge::new(
            T::Reject,
            S::Pending,
            S::Rejected,
            &[P::ApproveLoansL1, P::ApproveLoansL2, P::ApproveLoansL3],
        )
        .requires_note(),
        Edge::new(
            T::Reject,
            S::ApprovedL1,
            S::Rejected,
            &[P::ApproveLoansL1, P::ApproveLoansL2, P::ApproveLoansL3],
        )
        .requires_note(),
        Edge::new(
            T::Reject,
            S::ApprovedL2,
            S::Rejected,
            &[P::ApproveLoansL2, P::ApproveLoansL3],
        )
        .requires_note(),
        Edge::new(T::Reject, S::ApprovedL3, S::Rejected, &[P::ApproveLoansL3]).requires_note(),
    ],
};

pub(super) static HEALTH_CLAIM: Machine = Machine {
    kind: EntityKind::HealthClaim,
    initial: S::Submitted,
    statuses: &[S::Submitted, S::Approved, S::Paid, S::Rejected],
    terminal: &[S::Paid, S::Rejected],
    edges: &[
        Edge::new(T::Approve, S::Submitted, S::Approved, &[P::ApproveHealthClaims]),
        Edge::new(T::Pay, S::Approved, S::Paid, &[P::PayHealthClaims]).requires_reference(),
        Edge::new(
            T::Reject,
            S::Submitted,
            S::Rejected,
            &[P::ApproveHealthClaims, P::RejectHealthClaims],
        )
        .requires_note(),
    ],
};

pub(super) static CASHOUT_REQUEST: Machine = Machine {
    kind: EntityKind::CashoutRequest,
    initial: S::Pending,
    statuses: &[S::Pending, S::Verified, S::Approved, S::Disbursed, S::Rejected],
    terminal: &[S::Disbursed, S::Rejected],
    edges: &[
        Edge::new(T::Verify, S::Pending, S::Verified, &[P::VerifyCashouts]),
        Edge::new(T::Approve, S::Verified, S::Approved, &[P::ApproveCashouts]),
        Edge::new(T::Disburse, S::Approved, S::Disbursed, &[P::DisburseCashouts]).requires_reference(),
        Edge::new(
            T::Reject,
            S::Pending,
            S::Rejected,
            &[P::VerifyCashouts, P::ApproveCashouts],
        )
        .requires_note(),
        Edge::new(
            T::Reject,
            S::Verified,
            S::Rejected,
            &[P::VerifyCashouts, P::ApproveCashouts],
        )
        .requires_note(),
        Edge::new(
            T::Reject,
            S::Approved,
            S::Rejected,
            &[P::VerifyCashouts, P::ApproveCashouts],
        )
        .requires_note(),
    ],
};

pub(super) static PROGRAM_ENROLLMENT: Machine = Machine {
    kind: EntityKind::ProgramEnrollment,
    initial: S::Enrolled,
    statuses: &[S::Enrolled, S::Completed, S::Dropped],
    terminal: &[S::Dropped],
    edges: &[
        Edge::new(T::MarkCompleted, S::Enrolled, S::Completed, &[P::ManageEnrollments]),
        Edge::new(T::MarkDropped, S::Enrolled, S::Dropped, &[P::ManageEnrollments]),
        Edge::new(T::IssueCertificate, S::Completed, S::Completed, &[P::IssueCertificates])
            .guarded(Guard::CertificateNotIssued, Effect::IssueCertificate),
    ],
};
