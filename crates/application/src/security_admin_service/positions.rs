use super::*;

use lendgate_domain::{Position, PositionId};

use crate::security_admin_ports::{CreatePositionInput, PositionCapabilities};

impl SecurityAdminService {
    /// Returns positions with their capability map.
    pub async fn list_positions(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<PositionCapabilities>> {
        self.require_global(actor, resource_type::POSITION, action::READ)
            .await?;
        self.repository.list_positions().await
    }

    /// Creates a position identified by a stable code.
    pub async fn create_position(
        &self,
        actor: &ActorIdentity,
        input: CreatePositionInput,
    ) -> AppResult<Position> {
        self.require_global(actor, resource_type::POSITION, action::MANAGE)
            .await?;

        let position = Position::new(PositionId::new(), input.code, input.title)?;
        let event = AuditEvent::new(
            actor,
            AuditAction::PositionCreated,
            AuditEntityType::Position,
            position.position_id.to_string(),
        )
        .with_metadata(json!({ "code": position.code, "title": position.title }));
        self.repository.insert_position(&position, event).await?;

        Ok(position)
    }

    /// Gives a user a position and the capabilities mapped to it.
    pub async fn assign_position(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        position_id: PositionId,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;
        let PositionCapabilities {
            position,
            permissions,
        } = self.load_position_capabilities(position_id).await?;
        self.authorization_service
            .require_delegable(actor, &permissions)
            .await?;

        let event = Self::position_event(actor, AuditAction::PositionAssigned, &position)
            .with_target(user_id);
        self.repository
            .assign_position(user_id, position_id, event)
            .await
    }

    /// Removes a position from a user.
    pub async fn unassign_position(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        position_id: PositionId,
    ) -> AppResult<()> {
        self.require_user_access(actor, user_id, action::MANAGE)
            .await?;
        let position = self.load_position(position_id).await?;

        let event = Self::position_event(actor, AuditAction::PositionUnassigned, &position)
            .with_target(user_id);
        self.repository
            .unassign_position(user_id, position_id, event)
            .await
    }

    /// Maps or unmaps one permission for a position.
    pub async fn set_position_permission(
        &self,
        actor: &ActorIdentity,
        position_id: PositionId,
        permission_id: PermissionId,
        granted: bool,
    ) -> AppResult<()> {
        self.require_global(actor, resource_type::POSITION, action::MANAGE)
            .await?;
        let position = self.load_position(position_id).await?;

        let audit_action = if granted {
            self.load_active_permission(permission_id).await?;
            AuditAction::PositionPermissionGranted
        } else {
            AuditAction::PositionPermissionRevoked
        };
        let event = Self::position_event(actor, audit_action, &position).with_metadata(json!({
            "code": position.code,
            "permission_id": permission_id,
        }));

        self.repository
            .set_position_permission(position_id, permission_id, granted, event)
            .await?;
        self.invalidate_role_cache().await;

        Ok(())
    }

    async fn load_position(&self, position_id: PositionId) -> AppResult<Position> {
        self.repository
            .find_position(position_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("position '{position_id}' was not found")))
    }

    async fn load_position_capabilities(
        &self,
        position_id: PositionId,
    ) -> AppResult<PositionCapabilities> {
        self.repository
            .list_positions()
            .await?
            .into_iter()
            .find(|capabilities| capabilities.position.position_id == position_id)
            .ok_or_else(|| AppError::NotFound(format!("position '{position_id}' was not found")))
    }

    fn position_event(
        actor: &ActorIdentity,
        action: AuditAction,
        position: &Position,
    ) -> AuditEvent {
        AuditEvent::new(
            actor,
            action,
            AuditEntityType::Position,
            position.position_id.to_string(),
        )
        .with_metadata(json!({ "code": position.code }))
    }
}
