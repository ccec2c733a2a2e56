use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_user_roles_impl(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                user_roles.user_id,
                user_roles.role_id,
                roles.name AS role_name,
                user_roles.assigned_by,
                user_roles.assigned_at,
                user_roles.is_active
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1
            ORDER BY user_roles.assigned_at, roles.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list roles for user '{user_id}': {error}"))
        })?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    pub(super) async fn assign_role_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let assigned = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_by, assigned_at, is_active)
            VALUES ($1, $2, $3, now(), TRUE)
            ON CONFLICT (user_id, role_id) DO UPDATE
            SET assigned_by = EXCLUDED.assigned_by,
                assigned_at = EXCLUDED.assigned_at,
                is_active = TRUE,
                revoked_at = NULL
            WHERE NOT user_roles.is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(audit.actor_user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?;

        if assigned.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' already holds role '{role_id}'"
            )));
        }

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn revoke_role_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let revoked = sqlx::query(
            r#"
            UPDATE user_roles
            SET is_active = FALSE, revoked_at = now()
            WHERE user_id = $1 AND role_id = $2 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke role: {error}")))?;
        ensure_affected(revoked.rows_affected(), || {
            format!("user '{user_id}' does not hold role '{role_id}'")
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn grant_permission_overrides_impl(
        &self,
        user_id: UserId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        let permission_uuids = permission_ids
            .iter()
            .map(PermissionId::as_uuid)
            .collect::<Vec<_>>();
        let mut transaction = begin(&self.pool).await?;

        let granted = sqlx::query(
            r#"
            INSERT INTO user_permission_overrides (user_id, permission_id, granted_by, granted_at, is_active)
            SELECT $1, requested.permission_id, $3, now(), TRUE
            FROM (SELECT DISTINCT permission_id FROM UNNEST($2::UUID[]) AS ids (permission_id))
                AS requested
            ON CONFLICT (user_id, permission_id) DO UPDATE
            SET granted_by = EXCLUDED.granted_by,
                granted_at = EXCLUDED.granted_at,
                is_active = TRUE,
                revoked_at = NULL
            WHERE NOT user_permission_overrides.is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_uuids)
        .bind(audit.actor_user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to grant permission overrides: {error}"))
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await?;

        usize::try_from(granted.rows_affected())
            .map_err(|error| AppError::Internal(format!("invalid granted row count: {error}")))
    }

    pub(super) async fn revoke_permission_override_impl(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let revoked = sqlx::query(
            r#"
            UPDATE user_permission_overrides
            SET is_active = FALSE, revoked_at = now()
            WHERE user_id = $1 AND permission_id = $2 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to revoke permission override: {error}"))
        })?;
        ensure_affected(revoked.rows_affected(), || {
            format!("user '{user_id}' has no override for permission '{permission_id}'")
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn save_user_placement_impl(
        &self,
        user_id: UserId,
        placement: OrgPlacement,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO user_placements (user_id, team_id, department_id, branch_id, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id) DO UPDATE
            SET team_id = EXCLUDED.team_id,
                department_id = EXCLUDED.department_id,
                branch_id = EXCLUDED.branch_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(placement.team_id.map(|team_id| team_id.as_uuid()))
        .bind(placement.department_id.map(|department_id| department_id.as_uuid()))
        .bind(placement.branch_id.map(|branch_id| branch_id.as_uuid()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save placement for '{user_id}': {error}"))
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }
}
