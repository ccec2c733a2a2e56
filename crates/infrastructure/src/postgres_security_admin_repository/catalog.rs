use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<PermissionDefinition>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource_type, action, scope, description, is_active
            FROM permissions
            ORDER BY resource_type, action, scope
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?
        .into_iter()
        .map(PermissionDefinition::try_from)
        .collect()
    }

    pub(super) async fn find_permission_impl(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, resource_type, action, scope, description, is_active
            FROM permissions
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find permission '{permission_id}': {error}"))
        })?
        .map(PermissionDefinition::try_from)
        .transpose()
    }

    pub(super) async fn find_permissions_by_keys_impl(
        &self,
        keys: &[PermissionKey],
    ) -> AppResult<Vec<PermissionDefinition>> {
        let resource_types = keys
            .iter()
            .map(|key| key.resource_type().to_owned())
            .collect::<Vec<_>>();
        let actions = keys
            .iter()
            .map(|key| key.action().to_owned())
            .collect::<Vec<_>>();
        let scopes = keys
            .iter()
            .map(|key| key.scope().as_str().to_owned())
            .collect::<Vec<_>>();

        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT permissions.id,
                permissions.resource_type,
                permissions.action,
                permissions.scope,
                permissions.description,
                permissions.is_active
            FROM permissions
            INNER JOIN UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[])
                AS requested (resource_type, action, scope)
                ON requested.resource_type = permissions.resource_type
                AND requested.action = permissions.action
                AND requested.scope = permissions.scope
            WHERE permissions.is_active
            "#,
        )
        .bind(resource_types)
        .bind(actions)
        .bind(scopes)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permissions: {error}")))?
        .into_iter()
        .map(PermissionDefinition::try_from)
        .collect()
    }
}
