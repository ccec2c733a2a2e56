use super::*;

use lendgate_domain::{EffectivePermissionSet, OrgPlacement};

use crate::security_admin_ports::RoleAssignment;

impl SecurityAdminService {
    /// Returns active and revoked role assignments of a user.
    pub async fn list_user_roles(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_user_access(actor, user_id, action::READ)
            .await?;
        self.repository.list_user_roles(user_id).await
    }

    /// Returns the merged grants of a user with their sources.
    pub async fn user_effective_permissions(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
    ) -> AppResult<EffectivePermissionSet> {
        self.require_user_access(actor, user_id, action::READ)
            .await?;
        self.authorization_service
            .effective_permissions(user_id)
            .await
    }

    /// Assigns a role to a user.
    pub async fn assign_role_to_user(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;

        let role = self.load_role(role_id).await?;
        if !role.is_active() {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive",
                role.name()
            )));
        }
        self.require_delegable(actor, role.permissions()).await?;

        let event = AuditEvent::new(
            actor,
            AuditAction::UserRoleAssigned,
            AuditEntityType::User,
            user_id.to_string(),
        )
        .with_target(user_id)
        .with_metadata(json!({ "role_id": role_id, "role_name": role.name() }));

        self.repository.assign_role(user_id, role_id, event).await
    }

    /// Revokes a role assignment from a user.
    pub async fn revoke_role_from_user(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;

        let event = AuditEvent::new(
            actor,
            AuditAction::UserRoleRevoked,
            AuditEntityType::User,
            user_id.to_string(),
        )
        .with_target(user_id)
        .with_metadata(json!({ "role_id": role_id }));

        self.repository.revoke_role(user_id, role_id, event).await
    }

    /// Grants a direct permission override to a user.
    pub async fn grant_user_permission(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        permission_id: PermissionId,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;
        let permission = self.load_active_permission(permission_id).await?;
        self.authorization_service
            .require_delegable(actor, std::slice::from_ref(&permission.key))
            .await?;

        let mut event = AuditEvent::new(
            actor,
            AuditAction::UserPermissionGranted,
            AuditEntityType::User,
            user_id.to_string(),
        )
        .with_target(user_id)
        .with_metadata(json!({
            "permission_id": permission_id,
            "permission": permission.key.to_string(),
        }));
        if let Some(reason) = non_blank(reason) {
            event = event.with_reason(reason);
        }

        self.repository
            .grant_permission_overrides(user_id, &[permission_id], event)
            .await
            .map(|_| ())
    }

    /// Revokes a direct permission override from a user.
    pub async fn revoke_user_permission(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        permission_id: PermissionId,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;

        let mut event = AuditEvent::new(
            actor,
            AuditAction::UserPermissionRevoked,
            AuditEntityType::User,
            user_id.to_string(),
        )
        .with_target(user_id)
        .with_metadata(json!({ "permission_id": permission_id }));
        if let Some(reason) = non_blank(reason) {
            event = event.with_reason(reason);
        }

        self.repository
            .revoke_permission_override(user_id, permission_id, event)
            .await
    }

    /// Moves a user within the organization.
    pub async fn update_user_placement(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        placement: OrgPlacement,
    ) -> AppResult<()> {
        self.require_global(actor, resource_type::USER, action::MANAGE)
            .await?;

        let event = AuditEvent::new(
            actor,
            AuditAction::UserPlacementUpdated,
            AuditEntityType::User,
            user_id.to_string(),
        )
        .with_target(user_id)
        .with_metadata(json!({
            "team_id": placement.team_id,
            "department_id": placement.department_id,
            "branch_id": placement.branch_id,
        }));

        self.repository
            .save_user_placement(user_id, placement, event)
            .await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
