//! Per-kind state machines
//!
//! Each entity kind has one immutable [`Machine`]: its statuses, its initial
//! status, and the edges between them. An edge names the transition, the
//! permissions that qualify an actor (any one suffices) and an optional
//! guard on the entity's details.

mod tables;

use crate::types::EntityRecord;
use chrono::{DateTime, Utc};
use cofund_core::{EntityKind, Permission, Status, Transition};

/// Extra condition an edge places on the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    None,
    /// Enrollment certificate not yet issued
    CertificateNotIssued,
}

impl Guard {
    pub fn holds(&self, record: &EntityRecord) -> bool {
        match self {
            Guard::None => true,
            Guard::CertificateNotIssued => record
                .details
                .as_enrollment()
                .map(|d| !d.certificate_issued)
                .unwrap_or(false),
        }
    }
}

/// Detail mutation applied when an edge is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    IssueCertificate,
}

/// One allowed status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub transition: Transition,
    pub from: Status,
    pub to: Status,
    /// Qualifying permissions, OR semantics
    pub any_of: &'static [Permission],
    pub guard: Guard,
    pub effect: Effect,
    pub needs_note: bool,
    pub needs_reference: bool,
}

impl Edge {
    pub const fn new(
        transition: Transition,
        from: Status,
        to: Status,
        any_of: &'static [Permission],
    ) -> Self {
        Self {
            transition,
            from,
            to,
            any_of,
            guard: Guard::None,
            effect: Effect::None,
            needs_note: false,
            needs_reference: false,
        }
    }

    pub const fn guarded(self, guard: Guard, effect: Effect) -> Self {
        Self {
            guard,
            effect,
            ..self
        }
    }

    pub const fn requires_note(self) -> Self {
        Self {
            needs_note: true,
            ..self
        }
    }

    pub const fn requires_reference(self) -> Self {
        Self {
            needs_reference: true,
            ..self
        }
    }

    /// Move the record along this edge
    pub fn apply(&self, record: &mut EntityRecord, at: DateTime<Utc>) {
        record.status = self.to;

        if self.effect == Effect::IssueCertificate {
            if let Some(enrollment) = record.details.as_enrollment_mut() {
                enrollment.certificate_issued = true;
                enrollment.certificate_issued_at = Some(at);
            }
        }
    }
}

/// State machine of one entity kind
#[derive(Debug)]
pub struct Machine {
    pub kind: EntityKind,
    pub initial: Status,
    pub statuses: &'static [Status],
    pub terminal: &'static [Status],
    pub edges: &'static [Edge],
}

impl Machine {
    /// Edge for `transition` out of `from`, ignoring guards
    pub fn edge(&self, from: Status, transition: Transition) -> Option<&'static Edge> {
        let edges: &'static [Edge] = self.edges;
        edges
            .iter()
            .find(|e| e.from == from && e.transition == transition)
    }

    /// Edge the record may take for `transition`, guards included
    pub fn admits(&self, record: &EntityRecord, transition: Transition) -> Option<&'static Edge> {
        self.edge(record.status, transition)
            .filter(|e| e.guard.holds(record))
    }

    /// Edges leaving a status
    pub fn outgoing(&self, from: Status) -> impl Iterator<Item = &'static Edge> {
        let edges: &'static [Edge] = self.edges;
        edges.iter().filter(move |e| e.from == from)
    }

    pub fn has_status(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }

    pub fn is_terminal(&self, status: Status) -> bool {
        self.terminal.contains(&status)
    }

    /// Distinct transition names, in table order
    pub fn transitions(&self) -> Vec<Transition> {
        let mut out = Vec::new();
        for edge in self.edges {
            if !out.contains(&edge.transition) {
                out.push(edge.transition);
            }
        }
        out
    }
}

/// The state machine for a kind
pub fn machine_for(kind: EntityKind) -> &'static Machine {
    match kind {
        EntityKind::Member => &tables::MEMBER,
        EntityKind::Contribution => &tables::CONTRIBUTION,
        EntityKind::Loan => &tables::LOAN,
        EntityKind::HealthClaim => &tables::HEALTH_CLAIM,
        EntityKind::CashoutRequest => &tables::CASHOUT_REQUEST,
        EntityKind::ProgramEnrollment => &tables::PROGRAM_ENROLLMENT,
    }
}
