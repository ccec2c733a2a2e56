use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lendgate_application::{
    AuditEvent, PositionCapabilities, RoleAssignment, SecurityAdminRepository,
};
use lendgate_core::{AppError, AppResult, UserId};
use lendgate_domain::{
    OrgPlacement, PermissionDefinition, PermissionId, PermissionKey, PermissionTemplate, Position,
    PositionId, RoleDefinition, RoleId, TemplateId, TemplateKind,
};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::postgres_authorization_repository::decode_permission_key;
use crate::postgres_transaction::{append_audit_event, begin, commit, is_unique_violation};

mod catalog;
mod grants;
mod positions;
mod roles;
mod templates;

/// PostgreSQL-backed repository for role, template, grant and position administration.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    resource_type: String,
    action: String,
    scope: String,
    description: Option<String>,
    is_active: bool,
}

impl TryFrom<PermissionRow> for PermissionDefinition {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            permission_id: PermissionId::from_uuid(row.id),
            key: decode_permission_key(row.resource_type, row.action, &row.scope)?,
            description: row.description,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    display_name: String,
    level: i32,
    parent_role_id: Option<uuid::Uuid>,
    is_system: bool,
    is_active: bool,
    permission_ids: Vec<uuid::Uuid>,
}

impl TryFrom<RoleRow> for RoleDefinition {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        RoleDefinition::restore(
            RoleId::from_uuid(row.id),
            row.name,
            row.display_name,
            row.level,
            row.parent_role_id.map(RoleId::from_uuid),
            row.is_system,
            row.is_active,
            row.permission_ids
                .into_iter()
                .map(PermissionId::from_uuid)
                .collect(),
        )
        .map_err(|error| AppError::Internal(format!("failed to decode stored role: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: uuid::Uuid,
    name: String,
    description: String,
    kind: String,
    is_active: bool,
    usage_count: i32,
    permission_ids: Vec<uuid::Uuid>,
}

impl TryFrom<TemplateRow> for PermissionTemplate {
    type Error = AppError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let kind = TemplateKind::from_str(&row.kind).map_err(|error| {
            AppError::Internal(format!("failed to decode stored template kind: {error}"))
        })?;
        let usage_count = u32::try_from(row.usage_count).map_err(|error| {
            AppError::Internal(format!("failed to decode stored template usage: {error}"))
        })?;

        PermissionTemplate::restore(
            TemplateId::from_uuid(row.id),
            row.name,
            row.description,
            kind,
            row.is_active,
            usage_count,
            row.permission_ids
                .into_iter()
                .map(PermissionId::from_uuid)
                .collect(),
        )
        .map_err(|error| AppError::Internal(format!("failed to decode stored template: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct RoleAssignmentRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    role_name: String,
    assigned_by: uuid::Uuid,
    assigned_at: DateTime<Utc>,
    is_active: bool,
}

impl From<RoleAssignmentRow> for RoleAssignment {
    fn from(row: RoleAssignmentRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            role_id: RoleId::from_uuid(row.role_id),
            role_name: row.role_name,
            assigned_by: UserId::from_uuid(row.assigned_by),
            assigned_at: row.assigned_at,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct PositionRow {
    id: uuid::Uuid,
    code: String,
    title: String,
}

impl From<PositionRow> for Position {
    fn from(row: PositionRow) -> Self {
        Self {
            position_id: PositionId::from_uuid(row.id),
            code: row.code,
            title: row.title,
        }
    }
}

const ROLE_SELECT: &str = r#"
    SELECT
        roles.id,
        roles.name,
        roles.display_name,
        roles.level,
        roles.parent_role_id,
        roles.is_system,
        roles.is_active,
        COALESCE(
            ARRAY_AGG(grants.permission_id ORDER BY grants.granted_at, grants.permission_id)
                FILTER (WHERE grants.permission_id IS NOT NULL),
            '{}'
        ) AS permission_ids
    FROM roles
    LEFT JOIN role_permissions AS grants ON grants.role_id = roles.id
"#;

const TEMPLATE_SELECT: &str = r#"
    SELECT
        templates.id,
        templates.name,
        templates.description,
        templates.kind,
        templates.is_active,
        templates.usage_count,
        COALESCE(
            ARRAY_AGG(items.permission_id ORDER BY items.position)
                FILTER (WHERE items.permission_id IS NOT NULL),
            '{}'
        ) AS permission_ids
    FROM permission_templates AS templates
    LEFT JOIN template_permissions AS items ON items.template_id = templates.id
"#;

fn map_name_conflict(error: sqlx::Error, kind: &str, name: &str) -> AppError {
    if is_unique_violation(&error) {
        return AppError::Conflict(format!("{kind} '{name}' already exists"));
    }

    AppError::Internal(format!("failed to persist {kind} '{name}': {error}"))
}

fn ensure_affected(rows_affected: u64, message: impl FnOnce() -> String) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::NotFound(message()));
    }

    Ok(())
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        self.list_permissions_impl().await
    }

    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        self.find_permission_impl(permission_id).await
    }

    async fn find_permissions_by_keys(
        &self,
        keys: &[PermissionKey],
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.find_permissions_by_keys_impl(keys).await
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        self.list_roles_impl().await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        self.find_role_impl(role_id).await
    }

    async fn list_role_parents(&self) -> AppResult<Vec<(RoleId, RoleId)>> {
        self.list_role_parents_impl().await
    }

    async fn insert_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()> {
        self.insert_role_impl(role, None, audit).await
    }

    async fn insert_role_from_template(
        &self,
        role: &RoleDefinition,
        template_id: TemplateId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.insert_role_impl(role, Some(template_id), audit).await
    }

    async fn update_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()> {
        self.update_role_impl(role, audit).await
    }

    async fn delete_role(&self, role_id: RoleId, audit: AuditEvent) -> AppResult<()> {
        self.delete_role_impl(role_id, audit).await
    }

    async fn add_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        self.add_role_permissions_impl(role_id, permission_ids, audit)
            .await
    }

    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.remove_role_permission_impl(role_id, permission_id, audit)
            .await
    }

    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        self.list_user_roles_impl(user_id).await
    }

    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.assign_role_impl(user_id, role_id, audit).await
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.revoke_role_impl(user_id, role_id, audit).await
    }

    async fn grant_permission_overrides(
        &self,
        user_id: UserId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        self.grant_permission_overrides_impl(user_id, permission_ids, audit)
            .await
    }

    async fn revoke_permission_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.revoke_permission_override_impl(user_id, permission_id, audit)
            .await
    }

    async fn save_user_placement(
        &self,
        user_id: UserId,
        placement: OrgPlacement,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.save_user_placement_impl(user_id, placement, audit)
            .await
    }

    async fn list_templates(&self) -> AppResult<Vec<PermissionTemplate>> {
        self.list_templates_impl().await
    }

    async fn find_template(
        &self,
        template_id: TemplateId,
    ) -> AppResult<Option<PermissionTemplate>> {
        self.find_template_impl(template_id).await
    }

    async fn find_template_by_name(&self, name: &str) -> AppResult<Option<PermissionTemplate>> {
        self.find_template_by_name_impl(name).await
    }

    async fn insert_template(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.insert_template_impl(template, audit).await
    }

    async fn replace_template_permissions(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.replace_template_permissions_impl(template, audit)
            .await
    }

    async fn list_positions(&self) -> AppResult<Vec<PositionCapabilities>> {
        self.list_positions_impl().await
    }

    async fn find_position(&self, position_id: PositionId) -> AppResult<Option<Position>> {
        self.find_position_impl(position_id).await
    }

    async fn insert_position(&self, position: &Position, audit: AuditEvent) -> AppResult<()> {
        self.insert_position_impl(position, audit).await
    }

    async fn assign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.assign_position_impl(user_id, position_id, audit).await
    }

    async fn unassign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.unassign_position_impl(user_id, position_id, audit)
            .await
    }

    async fn set_position_permission(
        &self,
        position_id: PositionId,
        permission_id: PermissionId,
        granted: bool,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.set_position_permission_impl(position_id, permission_id, granted, audit)
            .await
    }
}
