//! The acting user passed explicitly to every policy and workflow call

use super::permission::{Permission, PermissionSet};
use super::{MemberId, UserId};
use serde::{Deserialize, Serialize};

/// Authenticated user with a resolved role and permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    /// User identifier
    pub id: UserId,

    /// Single assigned role (none for unprivileged accounts)
    #[serde(default)]
    pub role: Option<String>,

    /// Member record linked to this user, if any
    #[serde(default)]
    pub member_id: Option<MemberId>,

    /// Permissions derived from the role
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl ActingUser {
    /// Create a user without role, member link or permissions
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: None,
            member_id: None,
            permissions: PermissionSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_member(mut self, member_id: MemberId) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Whether the user holds the permission
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Whether the user holds at least one of the permissions
    pub fn can_any(&self, permissions: &[Permission]) -> bool {
        self.permissions.contains_any(permissions)
    }

    /// Whether the user is linked to the given member
    pub fn owns(&self, member_id: MemberId) -> bool {
        self.member_id == Some(member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_acting_user_builder() {
        let member = Uuid::new_v4();
        let user = ActingUser::new("user:alice")
            .with_role("treasurer")
            .with_member(member)
            .with_permission(Permission::DisburseLoans);

        assert_eq!(user.role.as_deref(), Some("treasurer"));
        assert!(user.owns(member));
        assert!(!user.owns(Uuid::new_v4()));
        assert!(user.can(Permission::DisburseLoans));
        assert!(!user.can(Permission::ApproveLoansL1));
    }

    #[test]
    fn test_unlinked_user_owns_nothing() {
        let user = ActingUser::new("user:bob");
        assert!(!user.owns(Uuid::nil()));
    }
}
