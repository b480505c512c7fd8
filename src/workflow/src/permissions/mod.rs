//! Role-based permission resolution
//!
//! A user's permission set is resolved once from their role and then
//! carried on the [`ActingUser`] for every policy check.

pub mod roles;

pub use roles::{default_roles, RoleDefinition};

use crate::error::{Result, WorkflowError};
use cofund_core::{ActingUser, MemberId, Permission, PermissionSet, UserId};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Source of role permissions
pub trait PermissionSource: Send + Sync {
    /// Permissions granted by a role; unknown roles grant nothing
    fn permissions_for_role(&self, role: &str) -> PermissionSet;

    /// Names of the roles granting a permission, sorted
    fn roles_with(&self, permission: Permission) -> Vec<String>;

    /// Build the acting user for an authenticated identity
    fn resolve(&self, user_id: UserId, role: Option<&str>, member_id: Option<MemberId>) -> ActingUser {
        let permissions = role
            .map(|r| self.permissions_for_role(r))
            .unwrap_or_default();

        debug!(
            user = %user_id,
            role = ?role,
            permissions = permissions.len(),
            "Resolved acting user"
        );

        ActingUser {
            id: user_id,
            role: role.map(str::to_string),
            member_id,
            permissions,
        }
    }

    /// Whether the user holds the named permission. Unknown names and users
    /// without a role fail closed.
    fn has_permission(&self, user: &ActingUser, name: &str) -> bool {
        match user.role.as_deref() {
            Some(role) if !role.trim().is_empty() => user.permissions.contains_named(name),
            _ => false,
        }
    }
}

/// Fixed role table loaded at startup
#[derive(Debug, Clone, Default)]
pub struct StaticRolePermissions {
    roles: HashMap<String, PermissionSet>,
}

impl StaticRolePermissions {
    /// Build the table from role definitions
    pub fn new(definitions: Vec<RoleDefinition>) -> Result<Self> {
        let mut roles = HashMap::with_capacity(definitions.len());

        for definition in definitions {
            let permissions = definition.resolve()?;
            if roles.insert(definition.name.clone(), permissions).is_some() {
                return Err(WorkflowError::Configuration(format!(
                    "Role '{}' is defined more than once",
                    definition.name
                )));
            }
        }

        info!(roles = roles.len(), "Loaded role permissions");
        Ok(Self { roles })
    }

    /// The default role catalogue
    pub fn with_default_roles() -> Self {
        let roles = default_roles()
            .into_iter()
            .filter_map(|d| d.resolve().ok().map(|p| (d.name, p)))
            .collect();
        Self { roles }
    }

    /// Parse a JSON list of role definitions
    pub fn from_json_str(json: &str) -> Result<Self> {
        let definitions: Vec<RoleDefinition> = serde_json::from_str(json)
            .map_err(|e| WorkflowError::Configuration(format!("Invalid role file: {}", e)))?;
        Self::new(definitions)
    }

    /// Load a JSON role file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        info!(path = %path.display(), "Reading role file");
        Self::from_json_str(&json)
    }

    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.roles.keys().cloned().collect();
        names.sort();
        names
    }
}

impl PermissionSource for StaticRolePermissions {
    fn permissions_for_role(&self, role: &str) -> PermissionSet {
        self.roles.get(role).cloned().unwrap_or_default()
    }

    fn roles_with(&self, permission: Permission) -> Vec<String> {
        let mut names: Vec<_> = self
            .roles
            .iter()
            .filter(|(_, set)| set.contains(permission))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
