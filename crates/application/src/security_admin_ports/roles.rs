use chrono::{DateTime, Utc};
use lendgate_core::UserId;
use lendgate_domain::{PermissionDefinition, PermissionId, RoleDefinition, RoleId, TemplateId};

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Display ordering level.
    pub level: i32,
    /// Optional parent role.
    pub parent_role_id: Option<RoleId>,
    /// Initial permissions, in order.
    pub permission_ids: Vec<PermissionId>,
}

/// Input payload for materializing a role from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleFromTemplateInput {
    /// Source template.
    pub template_id: TemplateId,
    /// Unique role name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Display ordering level.
    pub level: i32,
    /// Optional parent role.
    pub parent_role_id: Option<RoleId>,
}

/// Assignment projection mapping a user to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Role identifier.
    pub role_id: RoleId,
    /// Role name.
    pub role_name: String,
    /// User that made the assignment.
    pub assigned_by: UserId,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Revoked assignments stay on record as inactive.
    pub is_active: bool,
}

/// Roles × permissions grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    /// Columns, in catalog order.
    pub permissions: Vec<PermissionDefinition>,
    /// Rows with their granted permissions.
    pub roles: Vec<RoleDefinition>,
}

impl PermissionMatrix {
    /// Returns whether the cell at `(role_id, permission_id)` is granted.
    #[must_use]
    pub fn is_granted(&self, role_id: RoleId, permission_id: PermissionId) -> bool {
        self.roles
            .iter()
            .find(|role| role.role_id() == role_id)
            .is_some_and(|role| role.permissions().contains(&permission_id))
    }
}

/// Single matrix cell update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixToggleInput {
    /// Row.
    pub role_id: RoleId,
    /// Column.
    pub permission_id: PermissionId,
    /// Desired cell value.
    pub granted: bool,
}
