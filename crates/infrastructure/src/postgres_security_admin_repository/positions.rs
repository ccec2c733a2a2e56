use super::*;

#[derive(Debug, FromRow)]
struct PositionPermissionRow {
    position_id: uuid::Uuid,
    resource_type: String,
    action: String,
    scope: String,
}

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_positions_impl(&self) -> AppResult<Vec<PositionCapabilities>> {
        let positions = sqlx::query_as::<_, PositionRow>(
            r#"
            SELECT id, code, title
            FROM positions
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list positions: {error}")))?;

        let mappings = sqlx::query_as::<_, PositionPermissionRow>(
            r#"
            SELECT
                mapping.position_id,
                permissions.resource_type,
                permissions.action,
                permissions.scope
            FROM position_permissions AS mapping
            INNER JOIN permissions ON permissions.id = mapping.permission_id
            WHERE permissions.is_active
            ORDER BY permissions.resource_type, permissions.action, permissions.scope
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list position permissions: {error}"))
        })?;

        let mut capabilities = positions
            .into_iter()
            .map(|row| PositionCapabilities {
                position: Position::from(row),
                permissions: Vec::new(),
            })
            .collect::<Vec<_>>();

        for mapping in mappings {
            let key = decode_permission_key(mapping.resource_type, mapping.action, &mapping.scope)?;
            if let Some(entry) = capabilities
                .iter_mut()
                .find(|entry| entry.position.position_id.as_uuid() == mapping.position_id)
            {
                entry.permissions.push(key);
            }
        }

        Ok(capabilities)
    }

    pub(super) async fn find_position_impl(
        &self,
        position_id: PositionId,
    ) -> AppResult<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(
            r#"
            SELECT id, code, title
            FROM positions
            WHERE id = $1
            "#,
        )
        .bind(position_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find position '{position_id}': {error}"))
        })?;

        Ok(row.map(Position::from))
    }

    pub(super) async fn insert_position_impl(
        &self,
        position: &Position,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query("INSERT INTO positions (id, code, title) VALUES ($1, $2, $3)")
            .bind(position.position_id.as_uuid())
            .bind(position.code.as_str())
            .bind(position.title.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_name_conflict(error, "position", &position.code))?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn assign_position_impl(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let assigned = sqlx::query(
            r#"
            INSERT INTO user_positions (user_id, position_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, position_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(position_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign position: {error}")))?;

        if assigned.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' already holds position '{position_id}'"
            )));
        }

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn unassign_position_impl(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let removed = sqlx::query(
            "DELETE FROM user_positions WHERE user_id = $1 AND position_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(position_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to unassign position: {error}")))?;
        ensure_affected(removed.rows_affected(), || {
            format!("user '{user_id}' does not hold position '{position_id}'")
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn set_position_permission_impl(
        &self,
        position_id: PositionId,
        permission_id: PermissionId,
        granted: bool,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let statement = if granted {
            r#"
            INSERT INTO position_permissions (position_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (position_id, permission_id) DO NOTHING
            "#
        } else {
            "DELETE FROM position_permissions WHERE position_id = $1 AND permission_id = $2"
        };

        sqlx::query(statement)
            .bind(position_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to update position permission: {error}"))
            })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }
}
