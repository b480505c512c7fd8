//! Named permissions and permission sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

named_enum! {
    /// A named capability granted to roles
    pub enum Permission: UnknownPermission {
        // Members
        ViewMembers => "view_members",
        CreateMembers => "create_members",
        UpdateMembers => "update_members",
        DeleteMembers => "delete_members",
        ApproveMembers => "approve_members",
        SuspendMembers => "suspend_members",

        // Contributions
        ViewContributions => "view_contributions",
        CreateContributions => "create_contributions",
        UpdateContributions => "update_contributions",
        DeleteContributions => "delete_contributions",
        ConfirmContributions => "confirm_contributions",
        RejectContributions => "reject_contributions",

        // Loans
        ViewLoans => "view_loans",
        CreateLoans => "create_loans",
        UpdateLoans => "update_loans",
        DeleteLoans => "delete_loans",
        ApproveLoansL1 => "approve_loans_l1",
        ApproveLoansL2 => "approve_loans_l2",
        ApproveLoansL3 => "approve_loans_l3",
        DisburseLoans => "disburse_loans",

        // Health claims
        ViewHealthClaims => "view_health_claims",
        CreateHealthClaims => "create_health_claims",
        UpdateHealthClaims => "update_health_claims",
        DeleteHealthClaims => "delete_health_claims",
        ApproveHealthClaims => "approve_health_claims",
        RejectHealthClaims => "reject_health_claims",
        PayHealthClaims => "pay_health_claims",

        // Cashout requests
        ViewCashouts => "view_cashouts",
        CreateCashouts => "create_cashouts",
        VerifyCashouts => "verify_cashouts",
        ApproveCashouts => "approve_cashouts",
        DisburseCashouts => "disburse_cashouts",

        // Program enrollments
        ViewEnrollments => "view_enrollments",
        EnrollPrograms => "enroll_programs",
        UpdateEnrollments => "update_enrollments",
        DeleteEnrollments => "delete_enrollments",
        ManageEnrollments => "manage_enrollments",
        IssueCertificates => "issue_certificates",

        // Administration
        ViewAuditLogs => "view_audit_logs",
        RestoreRecords => "restore_records",
        ForceDeleteRecords => "force_delete_records",
    }
}

impl Permission {
    /// Expand a permission pattern against the catalogue.
    ///
    /// `*` matches everything, `prefix*` matches every permission whose name
    /// starts with `prefix`, anything else must be an exact name. Returns an
    /// empty list when nothing matches.
    pub fn expand(pattern: &str) -> Vec<Permission> {
        if pattern == "*" {
            return Self::ALL.to_vec();
        }

        if let Some(prefix) = pattern.strip_suffix('*') {
            return Self::ALL
                .iter()
                .copied()
                .filter(|p| p.as_str().starts_with(prefix))
                .collect();
        }

        Permission::from_str(pattern).map(|p| vec![p]).unwrap_or_default()
    }
}

/// A resolved set of permissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Create an empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding every known permission
    pub fn all() -> Self {
        Self(Permission::ALL.iter().copied().collect())
    }

    /// Add a permission
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Builder-style insert
    pub fn with(mut self, permission: Permission) -> Self {
        self.insert(permission);
        self
    }

    /// Whether the set contains the permission
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Whether the set contains the permission with the given name.
    ///
    /// Unknown names are never contained.
    pub fn contains_named(&self, name: &str) -> bool {
        Permission::from_str(name)
            .map(|p| self.contains(p))
            .unwrap_or(false)
    }

    /// Whether the set contains at least one of the permissions
    pub fn contains_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.contains(*p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_exact_name() {
        assert_eq!(
            Permission::expand("approve_loans_l2"),
            vec![Permission::ApproveLoansL2]
        );
    }

    #[test]
    fn test_expand_prefix_wildcard() {
        let expanded = Permission::expand("approve_loans_*");
        assert_eq!(
            expanded,
            vec![
                Permission::ApproveLoansL1,
                Permission::ApproveLoansL2,
                Permission::ApproveLoansL3,
            ]
        );
    }

    #[test]
    fn test_expand_universal_and_unknown() {
        assert_eq!(Permission::expand("*").len(), Permission::ALL.len());
        assert!(Permission::expand("launch_rockets").is_empty());
        assert!(Permission::expand("zzz*").is_empty());
    }

    #[test]
    fn test_contains_named_fails_closed() {
        let set = PermissionSet::new().with(Permission::ConfirmContributions);

        assert!(set.contains_named("confirm_contributions"));
        assert!(!set.contains_named("reject_contributions"));
        assert!(!set.contains_named("not_a_permission"));
        assert!(!set.contains_named(""));
    }

    #[test]
    fn test_contains_any_is_or() {
        let set = PermissionSet::new().with(Permission::ApproveLoansL2);

        assert!(set.contains_any(&[Permission::ApproveLoansL1, Permission::ApproveLoansL2]));
        assert!(!set.contains_any(&[Permission::ApproveLoansL1, Permission::ApproveLoansL3]));
        assert!(!set.contains_any(&[]));
    }

    #[test]
    fn test_serializes_as_name_list() {
        let set: PermissionSet = [Permission::ViewLoans, Permission::CreateLoans]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["view_loans","create_loans"]"#);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn permission() -> impl Strategy<Value = Permission> {
            (0..Permission::ALL.len()).prop_map(|i| Permission::ALL[i])
        }

        proptest! {
            #[test]
            fn expand_of_a_name_is_that_name(p in permission()) {
                prop_assert_eq!(Permission::expand(p.as_str()), vec![p]);
            }

            #[test]
            fn contains_any_matches_some_contains(
                held in prop::collection::vec(permission(), 0..8),
                wanted in prop::collection::vec(permission(), 0..8),
            ) {
                let set: PermissionSet = held.iter().copied().collect();
                prop_assert_eq!(
                    set.contains_any(&wanted),
                    wanted.iter().any(|w| held.contains(w))
                );
            }
        }
    }
}
