use std::collections::HashSet;

use lendgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{PermissionId, RoleId};

/// Maximum length of role and template names.
pub const NAME_MAX_LENGTH: usize = 64;

/// Role in the role graph with its ordered, duplicate-free permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    role_id: RoleId,
    name: NonEmptyString,
    display_name: NonEmptyString,
    level: i32,
    parent_role_id: Option<RoleId>,
    is_system: bool,
    is_active: bool,
    permissions: Vec<PermissionId>,
}

impl RoleDefinition {
    /// Creates a custom, active role with no permissions.
    pub fn new(
        role_id: RoleId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        level: i32,
        parent_role_id: Option<RoleId>,
    ) -> AppResult<Self> {
        if parent_role_id == Some(role_id) {
            return Err(AppError::CyclicHierarchy(format!(
                "role '{role_id}' cannot be its own parent"
            )));
        }

        Ok(Self {
            role_id,
            name: validate_name(name.into())?,
            display_name: NonEmptyString::new(display_name.into().trim())?,
            level,
            parent_role_id,
            is_system: false,
            is_active: true,
            permissions: Vec::new(),
        })
    }

    /// Rebuilds a role from persisted state.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        role_id: RoleId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        level: i32,
        parent_role_id: Option<RoleId>,
        is_system: bool,
        is_active: bool,
        permissions: Vec<PermissionId>,
    ) -> AppResult<Self> {
        let mut role = Self::new(role_id, name, display_name, level, parent_role_id)?;
        role.is_system = is_system;
        role.is_active = is_active;
        for permission_id in permissions {
            role.insert_permission(permission_id);
        }

        Ok(role)
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the hierarchy level used for ordering.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Returns the parent role.
    #[must_use]
    pub fn parent_role_id(&self) -> Option<RoleId> {
        self.parent_role_id
    }

    /// Returns whether the role is system-managed.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns whether the role contributes permissions to holders.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the ordered permission set.
    #[must_use]
    pub fn permissions(&self) -> &[PermissionId] {
        self.permissions.as_slice()
    }

    /// Fails with `SystemRoleProtected` for system roles.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::SystemRoleProtected(self.name.as_str().to_owned()));
        }

        Ok(())
    }

    /// Applies an update to descriptive and hierarchy fields.
    pub fn apply_update(&mut self, update: RoleUpdate) -> AppResult<()> {
        self.ensure_mutable()?;

        if let Some(display_name) = update.display_name {
            self.display_name = NonEmptyString::new(display_name.trim())?;
        }
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(parent_role_id) = update.parent_role_id {
            if parent_role_id == Some(self.role_id) {
                return Err(AppError::CyclicHierarchy(format!(
                    "role '{}' cannot be its own parent",
                    self.name.as_str()
                )));
            }
            self.parent_role_id = parent_role_id;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }

        Ok(())
    }

    /// Adds a permission, returning false when already present.
    pub fn grant_permission(&mut self, permission_id: PermissionId) -> AppResult<bool> {
        self.ensure_mutable()?;
        Ok(self.insert_permission(permission_id))
    }

    /// Removes a permission, returning false when absent.
    pub fn revoke_permission(&mut self, permission_id: PermissionId) -> AppResult<bool> {
        self.ensure_mutable()?;
        let before = self.permissions.len();
        self.permissions.retain(|value| value != &permission_id);
        Ok(self.permissions.len() != before)
    }

    /// Adds every permission not already present, preserving order.
    pub fn grant_permissions(
        &mut self,
        permission_ids: impl IntoIterator<Item = PermissionId>,
    ) -> AppResult<usize> {
        self.ensure_mutable()?;
        Ok(permission_ids
            .into_iter()
            .filter(|permission_id| self.insert_permission(*permission_id))
            .count())
    }

    fn insert_permission(&mut self, permission_id: PermissionId) -> bool {
        if self.permissions.contains(&permission_id) {
            return false;
        }
        self.permissions.push(permission_id);
        true
    }
}

/// Partial update of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New display name.
    pub display_name: Option<String>,
    /// New hierarchy level.
    pub level: Option<i32>,
    /// New parent; `Some(None)` clears the parent.
    pub parent_role_id: Option<Option<RoleId>>,
    /// New activation flag.
    pub is_active: Option<bool>,
}

/// Fails with `CyclicHierarchy` when making `parent_role_id` the parent of `role_id`
/// would close a loop.
///
/// `parent_of` resolves the current parent of any role in the graph.
pub fn ensure_acyclic_parent(
    role_id: RoleId,
    parent_role_id: Option<RoleId>,
    parent_of: impl Fn(RoleId) -> Option<RoleId>,
) -> AppResult<()> {
    let mut visited = HashSet::new();
    let mut cursor = parent_role_id;

    while let Some(current) = cursor {
        if current == role_id {
            return Err(AppError::CyclicHierarchy(format!(
                "assigning parent '{}' to role '{role_id}' creates a cycle",
                parent_role_id.map(|value| value.to_string()).unwrap_or_default()
            )));
        }
        if !visited.insert(current) {
            return Err(AppError::CyclicHierarchy(format!(
                "role hierarchy above '{current}' already contains a cycle"
            )));
        }
        cursor = parent_of(current);
    }

    Ok(())
}

/// Validates a unique machine name for roles and templates.
pub fn validate_name(value: String) -> AppResult<NonEmptyString> {
    let trimmed = value.trim();
    if trimmed.len() > NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "name '{trimmed}' exceeds {NAME_MAX_LENGTH} characters"
        )));
    }

    NonEmptyString::new(trimmed)
}
