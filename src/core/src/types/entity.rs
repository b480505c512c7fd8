//! Entity kinds, statuses and transition names

named_enum! {
    /// The workflow entity types
    pub enum EntityKind: UnknownKind {
        Member => "member",
        Contribution => "contribution",
        Loan => "loan",
        HealthClaim => "health_claim",
        CashoutRequest => "cashout_request",
        ProgramEnrollment => "program_enrollment",
    }
}

named_enum! {
    /// Every status any entity can be in.
    ///
    /// Which statuses are valid for which kind is decided by the state
    /// machine tables, not by this type.
    pub enum Status: UnknownStatus {
        PreRegistered => "pre_registered",
        Active => "active",
        Suspended => "suspended",
        Submitted => "submitted",
        Verified => "verified",
        Rejected => "rejected",
        Pending => "pending",
        ApprovedL1 => "approved_l1",
        ApprovedL2 => "approved_l2",
        ApprovedL3 => "approved_l3",
        Approved => "approved",
        Disbursed => "disbursed",
        Paid => "paid",
        Enrolled => "enrolled",
        Completed => "completed",
        Dropped => "dropped",
    }
}

named_enum! {
    /// Named, guarded status changes
    pub enum Transition: UnknownTransition {
        Approve => "approve",
        Suspend => "suspend",
        Reinstate => "reinstate",
        Confirm => "confirm",
        Reject => "reject",
        ApproveL1 => "approve_l1",
        ApproveL2 => "approve_l2",
        ApproveL3 => "approve_l3",
        Verify => "verify",
        Disburse => "disburse",
        Pay => "pay",
        MarkCompleted => "mark_completed",
        MarkDropped => "mark_dropped",
        IssueCertificate => "issue_certificate",
    }
}

impl EntityKind {
    /// Whether a member may view their own record of this kind without a
    /// `view_*` permission
    pub const fn owner_may_view(&self) -> bool {
        matches!(self, EntityKind::Member | EntityKind::CashoutRequest)
    }
}
