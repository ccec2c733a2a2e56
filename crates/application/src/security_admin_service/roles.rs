use std::collections::HashMap;

use super::*;

use lendgate_domain::{RoleUpdate, ensure_acyclic_parent};

use crate::security_admin_ports::{
    CreateRoleFromTemplateInput, CreateRoleInput, MatrixToggleInput, PermissionMatrix,
};

impl SecurityAdminService {
    /// Returns every role with its permission set.
    pub async fn list_roles(&self, actor: &ActorIdentity) -> AppResult<Vec<RoleDefinition>> {
        self.require_global(actor, resource_type::ROLE, action::READ)
            .await?;
        self.repository.list_roles().await
    }

    /// Returns system roles only.
    pub async fn list_standard_roles(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<RoleDefinition>> {
        Ok(self
            .list_roles(actor)
            .await?
            .into_iter()
            .filter(RoleDefinition::is_system)
            .collect())
    }

    /// Returns the permission catalog.
    pub async fn list_permissions(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.require_global(actor, resource_type::ROLE, action::READ)
            .await?;
        self.repository.list_permissions().await
    }

    /// Creates a custom role and emits an audit event.
    pub async fn create_role(
        &self,
        actor: &ActorIdentity,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require_role_manage(actor).await?;
        self.ensure_parent_exists(input.parent_role_id).await?;
        self.ensure_permissions_exist(&input.permission_ids).await?;

        let mut role = RoleDefinition::new(
            RoleId::new(),
            input.name,
            input.display_name,
            input.level,
            input.parent_role_id,
        )?;
        role.grant_permissions(input.permission_ids)?;

        let event = Self::role_event(actor, AuditAction::RoleCreated, &role);
        self.repository.insert_role(&role, event).await?;
        self.invalidate_role_cache().await;

        Ok(role)
    }

    /// Copies a template's permission set into a new role.
    pub async fn create_role_from_template(
        &self,
        actor: &ActorIdentity,
        input: CreateRoleFromTemplateInput,
    ) -> AppResult<RoleDefinition> {
        self.require_role_manage(actor).await?;

        let template = self
            .repository
            .find_template(input.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("template '{}' was not found", input.template_id))
            })?;
        template.ensure_usable()?;
        self.ensure_parent_exists(input.parent_role_id).await?;

        let mut role = RoleDefinition::new(
            RoleId::new(),
            input.name,
            input.display_name,
            input.level,
            input.parent_role_id,
        )?;
        role.grant_permissions(template.permissions().iter().copied())?;

        let event = Self::role_event(actor, AuditAction::RoleCreatedFromTemplate, &role)
            .with_metadata(json!({
                "role_name": role.name(),
                "template_id": template.template_id(),
                "template_name": template.name(),
            }));
        self.repository
            .insert_role_from_template(&role, template.template_id(), event)
            .await?;
        self.invalidate_role_cache().await;

        Ok(role)
    }

    /// Updates descriptive, hierarchy and activation fields of a custom role.
    pub async fn update_role(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        update: RoleUpdate,
    ) -> AppResult<RoleDefinition> {
        self.require_role_manage(actor).await?;

        let mut role = self.load_role(role_id).await?;
        role.ensure_mutable()?;

        if let Some(parent_role_id) = update.parent_role_id {
            self.ensure_parent_exists(parent_role_id).await?;
            let parents = self
                .repository
                .list_role_parents()
                .await?
                .into_iter()
                .collect::<HashMap<_, _>>();
            ensure_acyclic_parent(role_id, parent_role_id, |current| {
                parents.get(&current).copied()
            })?;
        }

        role.apply_update(update)?;

        let event = Self::role_event(actor, AuditAction::RoleUpdated, &role).with_metadata(json!({
            "role_name": role.name(),
            "display_name": role.display_name(),
            "level": role.level(),
            "parent_role_id": role.parent_role_id(),
            "is_active": role.is_active(),
        }));
        self.repository.update_role(&role, event).await?;
        self.invalidate_role_cache().await;

        Ok(role)
    }

    /// Deletes a custom role and its assignments.
    pub async fn delete_role(&self, actor: &ActorIdentity, role_id: RoleId) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let role = self.load_role(role_id).await?;
        role.ensure_mutable()?;

        let event = Self::role_event(actor, AuditAction::RoleDeleted, &role);
        self.repository.delete_role(role_id, event).await?;
        self.invalidate_role_cache().await;

        Ok(())
    }

    /// Links one permission to a custom role.
    pub async fn assign_permission(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let mut role = self.load_role(role_id).await?;
        let permission = self.load_active_permission(permission_id).await?;
        if !role.grant_permission(permission_id)? {
            return Err(AppError::Conflict(format!(
                "role '{}' already holds '{}'",
                role.name(),
                permission.key
            )));
        }

        let event = Self::role_event(actor, AuditAction::RolePermissionGranted, &role)
            .with_metadata(json!({
                "role_name": role.name(),
                "permission_id": permission_id,
                "permission": permission.key.to_string(),
            }));
        self.repository
            .add_role_permissions(role_id, &[permission_id], event)
            .await?;
        self.invalidate_role_cache().await;

        Ok(())
    }

    /// Unlinks one permission from a custom role.
    pub async fn revoke_permission(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_role_manage(actor).await?;

        let mut role = self.load_role(role_id).await?;
        if !role.revoke_permission(permission_id)? {
            return Err(AppError::NotFound(format!(
                "role '{}' does not hold permission '{permission_id}'",
                role.name()
            )));
        }

        let event = Self::role_event(actor, AuditAction::RolePermissionRevoked, &role)
            .with_metadata(json!({
                "role_name": role.name(),
                "permission_id": permission_id,
            }));
        self.repository
            .remove_role_permission(role_id, permission_id, event)
            .await?;
        self.invalidate_role_cache().await;

        Ok(())
    }

    /// Returns the roles × permissions grid.
    pub async fn permission_matrix(&self, actor: &ActorIdentity) -> AppResult<PermissionMatrix> {
        self.require_global(actor, resource_type::ROLE, action::READ)
            .await?;

        Ok(PermissionMatrix {
            permissions: self.repository.list_permissions().await?,
            roles: self.repository.list_roles().await?,
        })
    }

    /// Sets one matrix cell; returns false when the cell already had the requested value.
    pub async fn toggle_matrix_cell(
        &self,
        actor: &ActorIdentity,
        input: MatrixToggleInput,
    ) -> AppResult<bool> {
        self.require_role_manage(actor).await?;

        let role = self.load_role(input.role_id).await?;
        role.ensure_mutable()?;
        if role.permissions().contains(&input.permission_id) == input.granted {
            return Ok(false);
        }

        if input.granted {
            self.assign_permission(actor, input.role_id, input.permission_id)
                .await?;
        } else {
            self.revoke_permission(actor, input.role_id, input.permission_id)
                .await?;
        }

        Ok(true)
    }

    async fn ensure_parent_exists(&self, parent_role_id: Option<RoleId>) -> AppResult<()> {
        if let Some(parent_role_id) = parent_role_id {
            self.load_role(parent_role_id).await?;
        }

        Ok(())
    }
}
