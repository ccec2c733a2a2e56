use std::sync::Arc;

use lendgate_core::{ActorIdentity, AppError, AppResult, UserId};
use lendgate_domain::permission::{action, resource_type};
use lendgate_domain::{
    AuditAction, AuditEntityType, PermissionDefinition, PermissionId, PermissionKey,
    RoleDefinition, RoleId, ScopeContext,
};
use serde_json::json;
use tracing::warn;

use crate::{AuditEvent, AuthorizationService, SecurityAdminRepository};

mod grants;
mod positions;
mod roles;
mod templates;

/// Application service for role, template, grant and position administration.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SecurityAdminRepository>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SecurityAdminRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
        }
    }

    async fn require_global(
        &self,
        actor: &ActorIdentity,
        resource_type: &str,
        action: &str,
    ) -> AppResult<()> {
        self.authorization_service
            .require_global(actor, resource_type, action)
            .await
            .map(|_| ())
    }

    async fn require_role_manage(&self, actor: &ActorIdentity) -> AppResult<()> {
        self.require_global(actor, resource_type::ROLE, action::MANAGE)
            .await
    }

    async fn require_template_manage(&self, actor: &ActorIdentity) -> AppResult<()> {
        self.require_global(actor, resource_type::TEMPLATE, action::MANAGE)
            .await
    }

    /// Checks `action` on a user against that user's own placement.
    async fn require_user_access(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        action: &str,
    ) -> AppResult<()> {
        let placement = self.authorization_service.placement_of(user_id).await?;
        let context = ScopeContext {
            owner_user_id: Some(user_id),
            team_id: placement.team_id,
            department_id: placement.department_id,
            branch_id: placement.branch_id,
        };

        self.authorization_service
            .require(actor, resource_type::USER, action, &context)
            .await
            .map(|_| ())
    }

    /// Refuses to hand out catalog entries the actor does not hold itself.
    async fn require_delegable(
        &self,
        actor: &ActorIdentity,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let keys = self.active_keys(permission_ids).await?;
        self.authorization_service
            .require_delegable(actor, &keys)
            .await
    }

    /// Resolves catalog ids to triples; inactive entries grant nothing and are skipped.
    async fn active_keys(&self, permission_ids: &[PermissionId]) -> AppResult<Vec<PermissionKey>> {
        Ok(self
            .repository
            .list_permissions()
            .await?
            .into_iter()
            .filter(|permission| {
                permission.is_active && permission_ids.contains(&permission.permission_id)
            })
            .map(|permission| permission.key)
            .collect())
    }

    async fn load_role(&self, role_id: RoleId) -> AppResult<RoleDefinition> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn load_active_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<PermissionDefinition> {
        let permission = self
            .repository
            .find_permission(permission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("permission '{permission_id}' was not found"))
            })?;

        if !permission.is_active {
            return Err(AppError::Validation(format!(
                "permission '{}' is inactive",
                permission.key
            )));
        }

        Ok(permission)
    }

    async fn ensure_permissions_exist(&self, permission_ids: &[PermissionId]) -> AppResult<()> {
        for permission_id in permission_ids {
            self.load_active_permission(*permission_id).await?;
        }

        Ok(())
    }

    /// Drops cached role sets after a committed mutation; failures are logged.
    async fn invalidate_role_cache(&self) {
        if let Err(error) = self.authorization_service.invalidate_role_cache().await {
            warn!(%error, "failed to invalidate role permission cache");
        }
    }

    fn role_event(
        actor: &ActorIdentity,
        action: AuditAction,
        role: &RoleDefinition,
    ) -> AuditEvent {
        AuditEvent::new(actor, action, AuditEntityType::Role, role.role_id().to_string())
            .with_metadata(json!({ "role_name": role.name() }))
    }
}
