use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<RoleDefinition>> {
        sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} GROUP BY roles.id ORDER BY roles.level DESC, roles.name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?
        .into_iter()
        .map(RoleDefinition::try_from)
        .collect()
    }

    pub(super) async fn find_role_impl(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} WHERE roles.id = $1 GROUP BY roles.id"
        ))
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role '{role_id}': {error}")))?
        .map(RoleDefinition::try_from)
        .transpose()
    }

    pub(super) async fn list_role_parents_impl(&self) -> AppResult<Vec<(RoleId, RoleId)>> {
        let rows = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid)>(
            r#"
            SELECT id, parent_role_id
            FROM roles
            WHERE parent_role_id IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role parents: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|(role_id, parent_id)| (RoleId::from_uuid(role_id), RoleId::from_uuid(parent_id)))
            .collect())
    }

    pub(super) async fn insert_role_impl(
        &self,
        role: &RoleDefinition,
        template_id: Option<TemplateId>,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, display_name, level, parent_role_id, is_system, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.name())
        .bind(role.display_name())
        .bind(role.level())
        .bind(role.parent_role_id().map(|parent| parent.as_uuid()))
        .bind(role.is_system())
        .bind(role.is_active())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_name_conflict(error, "role", role.name()))?;

        insert_role_permissions(&mut transaction, role.role_id(), role.permissions()).await?;

        if let Some(template_id) = template_id {
            let updated = sqlx::query(
                r#"
                UPDATE permission_templates
                SET usage_count = usage_count + 1, updated_at = now()
                WHERE id = $1 AND is_active
                "#,
            )
            .bind(template_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to record template usage: {error}"))
            })?;
            if updated.rows_affected() == 0 {
                return Err(AppError::InvalidTemplate(format!(
                    "template '{template_id}' is missing or inactive"
                )));
            }
        }

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn update_role_impl(
        &self,
        role: &RoleDefinition,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;
        if let Some(parent_role_id) = role.parent_role_id() {
            ensure_parent_keeps_hierarchy_acyclic(&mut transaction, role.role_id(), parent_role_id)
                .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE roles
            SET display_name = $2,
                level = $3,
                parent_role_id = $4,
                is_active = $5,
                updated_at = now()
            WHERE id = $1 AND NOT is_system
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.display_name())
        .bind(role.level())
        .bind(role.parent_role_id().map(|parent| parent.as_uuid()))
        .bind(role.is_active())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?;
        ensure_affected(updated.rows_affected(), || {
            format!("custom role '{}' was not found", role.role_id())
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId, audit: AuditEvent) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1 AND NOT is_system")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;
        ensure_affected(deleted.rows_affected(), || {
            format!("custom role '{role_id}' was not found")
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn add_role_permissions_impl(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        let mut transaction = begin(&self.pool).await?;
        lock_role(&mut transaction, role_id).await?;

        let added = insert_role_permissions(&mut transaction, role_id, permission_ids).await?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await?;
        Ok(added)
    }

    pub(super) async fn remove_role_permission_impl(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;
        lock_role(&mut transaction, role_id).await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1 AND permission_id = $2
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role permission: {error}"))
        })?;
        ensure_affected(removed.rows_affected(), || {
            format!("role '{role_id}' does not hold permission '{permission_id}'")
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }
}

/// Re-checks the parent link against committed links while holding off other role writers.
async fn ensure_parent_keeps_hierarchy_acyclic(
    connection: &mut PgConnection,
    role_id: RoleId,
    parent_role_id: RoleId,
) -> AppResult<()> {
    // Self-conflicting mode: concurrent parent updates run their walks one after another.
    sqlx::query("LOCK TABLE roles IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *connection)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock roles: {error}")))?;

    let cyclic = sqlx::query_scalar::<_, bool>(
        r#"
        WITH RECURSIVE ancestors (id, parent_role_id) AS (
            SELECT id, parent_role_id
            FROM roles
            WHERE id = $2
            UNION
            SELECT roles.id, roles.parent_role_id
            FROM roles
            INNER JOIN ancestors ON roles.id = ancestors.parent_role_id
        )
        SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $1)
        "#,
    )
    .bind(role_id.as_uuid())
    .bind(parent_role_id.as_uuid())
    .fetch_one(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to walk role ancestors: {error}")))?;

    if cyclic {
        return Err(AppError::CyclicHierarchy(format!(
            "role '{parent_role_id}' cannot be the parent of '{role_id}'"
        )));
    }

    Ok(())
}

/// Locks a custom role row for the rest of the transaction.
async fn lock_role(connection: &mut PgConnection, role_id: RoleId) -> AppResult<()> {
    let locked = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        SELECT id
        FROM roles
        WHERE id = $1 AND NOT is_system
        FOR UPDATE
        "#,
    )
    .bind(role_id.as_uuid())
    .fetch_optional(connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to lock role '{role_id}': {error}")))?;

    match locked {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!(
            "custom role '{role_id}' was not found"
        ))),
    }
}

async fn insert_role_permissions(
    connection: &mut PgConnection,
    role_id: RoleId,
    permission_ids: &[PermissionId],
) -> AppResult<usize> {
    let permission_uuids = permission_ids
        .iter()
        .map(PermissionId::as_uuid)
        .collect::<Vec<_>>();

    let inserted = sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_id, granted_at)
        SELECT $1, requested.permission_id, clock_timestamp()
        FROM UNNEST($2::UUID[]) WITH ORDINALITY AS requested (permission_id, ordinal)
        ORDER BY requested.ordinal
        ON CONFLICT (role_id, permission_id) DO NOTHING
        "#,
    )
    .bind(role_id.as_uuid())
    .bind(permission_uuids)
    .execute(connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to persist role permissions: {error}")))?;

    usize::try_from(inserted.rows_affected())
        .map_err(|error| AppError::Internal(format!("invalid inserted row count: {error}")))
}
