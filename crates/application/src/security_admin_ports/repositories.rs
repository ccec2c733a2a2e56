use async_trait::async_trait;

use lendgate_core::{AppResult, UserId};
use lendgate_domain::{
    OrgPlacement, PermissionDefinition, PermissionId, PermissionKey, PermissionTemplate, Position,
    PositionId, RoleDefinition, RoleId, TemplateId,
};

use crate::AuditEvent;

use super::positions::PositionCapabilities;
use super::roles::RoleAssignment;

/// Repository port for role, template, grant and position administration.
///
/// Every method taking an [`AuditEvent`] appends it in the same transaction as
/// the mutation; a failed append fails the whole call.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Lists the permission catalog, inactive entries included.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>>;

    /// Finds one catalog entry.
    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>>;

    /// Resolves active catalog entries for the given triples; unknown triples are omitted.
    async fn find_permissions_by_keys(
        &self,
        keys: &[PermissionKey],
    ) -> AppResult<Vec<PermissionDefinition>>;

    /// Lists all roles with their permission sets.
    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>>;

    /// Finds one role.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>>;

    /// Lists `(role, parent)` links for hierarchy checks.
    async fn list_role_parents(&self) -> AppResult<Vec<(RoleId, RoleId)>>;

    /// Inserts a role with its permission set.
    async fn insert_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()>;

    /// Inserts a role with its permission set and bumps the template usage count.
    async fn insert_role_from_template(
        &self,
        role: &RoleDefinition,
        template_id: TemplateId,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Persists role fields; the permission set is untouched.
    async fn update_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()>;

    /// Deletes a role together with its links and assignments.
    async fn delete_role(&self, role_id: RoleId, audit: AuditEvent) -> AppResult<()>;

    /// Appends permissions missing from the role and returns how many were added.
    async fn add_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize>;

    /// Removes one permission from the role.
    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Lists active and revoked role assignments of a user.
    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>>;

    /// Activates a role assignment; `Conflict` when already active.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId, audit: AuditEvent)
    -> AppResult<()>;

    /// Deactivates a role assignment; `NotFound` when no active assignment exists.
    async fn revoke_role(&self, user_id: UserId, role_id: RoleId, audit: AuditEvent)
    -> AppResult<()>;

    /// Activates direct overrides and returns how many were not active before.
    async fn grant_permission_overrides(
        &self,
        user_id: UserId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize>;

    /// Deactivates a direct override; `NotFound` when none is active.
    async fn revoke_permission_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Stores a user's organizational placement.
    async fn save_user_placement(
        &self,
        user_id: UserId,
        placement: OrgPlacement,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Lists templates.
    async fn list_templates(&self) -> AppResult<Vec<PermissionTemplate>>;

    /// Finds one template.
    async fn find_template(&self, template_id: TemplateId)
    -> AppResult<Option<PermissionTemplate>>;

    /// Finds a template by its unique name.
    async fn find_template_by_name(&self, name: &str) -> AppResult<Option<PermissionTemplate>>;

    /// Inserts a template; `Conflict` on duplicate name.
    async fn insert_template(&self, template: &PermissionTemplate, audit: AuditEvent)
    -> AppResult<()>;

    /// Replaces a template's permission set.
    async fn replace_template_permissions(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Lists positions with their capability map.
    async fn list_positions(&self) -> AppResult<Vec<PositionCapabilities>>;

    /// Finds one position.
    async fn find_position(&self, position_id: PositionId) -> AppResult<Option<Position>>;

    /// Inserts a position; `Conflict` on duplicate code.
    async fn insert_position(&self, position: &Position, audit: AuditEvent) -> AppResult<()>;

    /// Assigns a position to a user; `Conflict` when already held.
    async fn assign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Removes a position from a user; `NotFound` when not held.
    async fn unassign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Maps or unmaps one permission for a position.
    async fn set_position_permission(
        &self,
        position_id: PositionId,
        permission_id: PermissionId,
        granted: bool,
        audit: AuditEvent,
    ) -> AppResult<()>;
}
