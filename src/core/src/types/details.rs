//! Per-kind detail payloads and their field validation
//!
//! Amounts are integers in the fund's minor currency unit.

use super::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Flatten `validator` output into per-field errors, sorted by field name
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(field.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

fn validate_period(period: &str) -> Result<(), ValidationError> {
    let valid = period.is_ascii()
        && period.len() == 7
        && period.as_bytes()[4] == b'-'
        && period[..4].chars().all(|c| c.is_ascii_digit())
        && period[5..]
            .parse::<u8>()
            .map(|month| (1..=12).contains(&month))
            .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("period");
        err.message = Some("period must be formatted YYYY-MM".into());
        Err(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MemberDetails {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,

    #[validate(length(min = 7, max = 20))]
    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 40))]
    pub national_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContributionDetails {
    #[validate(range(min = 1))]
    pub amount: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub fine_amount: i64,

    /// Contribution period, `YYYY-MM`
    #[validate(custom(function = "validate_period"))]
    pub period: String,

    /// Reference of the uploaded payment receipt
    #[validate(length(min = 1, max = 128))]
    pub receipt_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoanDetails {
    #[validate(range(min = 1))]
    pub amount: i64,

    #[validate(range(min = 1, max = 60))]
    pub term_months: u32,

    #[validate(length(min = 1, max = 500))]
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HealthClaimDetails {
    #[validate(range(min = 1))]
    pub amount: i64,

    #[validate(length(min = 1, max = 200))]
    pub hospital: String,

    #[validate(length(min = 1, max = 1000))]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CashoutDetails {
    #[validate(range(min = 1))]
    pub amount: i64,

    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EnrollmentDetails {
    pub program_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub program_name: String,

    /// Set only by the certificate transition
    #[serde(default)]
    pub certificate_issued: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_issued_at: Option<DateTime<Utc>>,
}

/// Detail payload of an entity, tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetails {
    Member(MemberDetails),
    Contribution(ContributionDetails),
    Loan(LoanDetails),
    HealthClaim(HealthClaimDetails),
    CashoutRequest(CashoutDetails),
    ProgramEnrollment(EnrollmentDetails),
}

impl EntityDetails {
    /// Entity kind this payload belongs to
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDetails::Member(_) => EntityKind::Member,
            EntityDetails::Contribution(_) => EntityKind::Contribution,
            EntityDetails::Loan(_) => EntityKind::Loan,
            EntityDetails::HealthClaim(_) => EntityKind::HealthClaim,
            EntityDetails::CashoutRequest(_) => EntityKind::CashoutRequest,
            EntityDetails::ProgramEnrollment(_) => EntityKind::ProgramEnrollment,
        }
    }

    /// Validate the payload for the given kind.
    ///
    /// A payload of another kind is reported against the `details` field.
    pub fn validate_for(&self, kind: EntityKind) -> Result<(), Vec<FieldError>> {
        if self.kind() != kind {
            return Err(vec![FieldError::new(
                "details",
                format!("expected {} details, got {}", kind, self.kind()),
            )]);
        }

        let result = match self {
            EntityDetails::Member(d) => d.validate(),
            EntityDetails::Contribution(d) => d.validate(),
            EntityDetails::Loan(d) => d.validate(),
            EntityDetails::HealthClaim(d) => d.validate(),
            EntityDetails::CashoutRequest(d) => d.validate(),
            EntityDetails::ProgramEnrollment(d) => d.validate(),
        };

        let mut errors = result.err().map(|e| field_errors(&e)).unwrap_or_default();

        if let EntityDetails::Contribution(d) = self {
            if d.amount.checked_add(d.fine_amount).is_none() {
                errors.push(FieldError::new(
                    "fine_amount",
                    "amount plus fine_amount is out of range",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The enrollment payload, if this is one
    pub fn as_enrollment(&self) -> Option<&EnrollmentDetails> {
        match self {
            EntityDetails::ProgramEnrollment(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enrollment_mut(&mut self) -> Option<&mut EnrollmentDetails> {
        match self {
            EntityDetails::ProgramEnrollment(d) => Some(d),
            _ => None,
        }
    }

    /// Requested amount, for kinds that carry one. `None` for a contribution
    /// whose total overflows.
    pub fn amount(&self) -> Option<i64> {
        match self {
            EntityDetails::Contribution(d) => d.amount.checked_add(d.fine_amount),
            EntityDetails::Loan(d) => Some(d.amount),
            EntityDetails::HealthClaim(d) => Some(d.amount),
            EntityDetails::CashoutRequest(d) => Some(d.amount),
            EntityDetails::Member(_) | EntityDetails::ProgramEnrollment(_) => None,
        }
    }
}
