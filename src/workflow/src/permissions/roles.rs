//! Role definitions and the default role catalogue

use crate::error::{Result, WorkflowError};
use cofund_core::{Permission, PermissionSet};
use serde::{Deserialize, Serialize};

/// Role definition
///
/// Permission entries are exact permission names or patterns:
/// `*` grants everything, `prefix*` grants every permission starting with
/// `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Unique role name (e.g., "treasurer")
    pub name: String,

    /// Granted permission names or patterns
    pub permissions: Vec<String>,
}

impl RoleDefinition {
    /// Create a new role definition
    pub fn new<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Validate the role definition
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Configuration(
                "Role name cannot be empty".to_string(),
            ));
        }

        for entry in &self.permissions {
            if entry.is_empty() {
                return Err(WorkflowError::Configuration(format!(
                    "Role '{}' has an empty permission entry",
                    self.name
                )));
            }

            if Permission::expand(entry).is_empty() {
                return Err(WorkflowError::Configuration(format!(
                    "Role '{}' grants unknown permission '{}'",
                    self.name, entry
                )));
            }
        }

        Ok(())
    }

    /// Resolve the granted entries into a permission set
    pub fn resolve(&self) -> Result<PermissionSet> {
        self.validate()?;

        Ok(self
            .permissions
            .iter()
            .flat_map(|entry| Permission::expand(entry))
            .collect())
    }
}

/// The roles shipped with the fund
pub fn default_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new("admin", ["*"]),
        RoleDefinition::new(
            "chairperson",
            [
                "view_*",
                "approve_members",
                "suspend_members",
                "approve_loans_l3",
                "approve_cashouts",
                "approve_health_claims",
                "reject_health_claims",
                "restore_records",
            ],
        ),
        RoleDefinition::new(
            "secretary",
            [
                "view_members",
                "create_members",
                "update_members",
                "approve_members",
                "view_contributions",
                "view_loans",
                "approve_loans_l1",
                "view_cashouts",
                "verify_cashouts",
                "view_enrollments",
            ],
        ),
        RoleDefinition::new(
            "treasurer",
            [
                "view_members",
                "view_contributions",
                "create_contributions",
                "update_contributions",
                "confirm_contributions",
                "reject_contributions",
                "view_loans",
                "disburse_loans",
                "view_health_claims",
                "pay_health_claims",
                "view_cashouts",
                "disburse_cashouts",
            ],
        ),
        RoleDefinition::new("loan_officer", ["view_members", "view_loans", "approve_loans_l1"]),
        RoleDefinition::new("loan_committee", ["view_members", "view_loans", "approve_loans_l2"]),
        RoleDefinition::new(
            "health_officer",
            [
                "view_members",
                "view_health_claims",
                "update_health_claims",
                "approve_health_claims",
                "reject_health_claims",
            ],
        ),
        RoleDefinition::new(
            "program_coordinator",
            [
                "view_members",
                "view_enrollments",
                "enroll_programs",
                "update_enrollments",
                "delete_enrollments",
                "manage_enrollments",
                "issue_certificates",
            ],
        ),
        RoleDefinition::new(
            "member",
            [
                "create_contributions",
                "create_loans",
                "create_health_claims",
                "create_cashouts",
                "enroll_programs",
            ],
        ),
    ]
}
