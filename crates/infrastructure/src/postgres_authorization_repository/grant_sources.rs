use super::*;

impl PostgresAuthorizationRepository {
    pub(super) async fn load_grant_sources_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<ActorGrantSources> {
        let placement = self.find_placement_impl(user_id).await?;

        let role_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT user_roles.role_id
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1
                AND user_roles.is_active
                AND roles.is_active
            ORDER BY user_roles.assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role assignments for '{user_id}': {error}"))
        })?
        .into_iter()
        .map(RoleId::from_uuid)
        .collect();

        let overrides = sqlx::query_as::<_, PermissionTripleRow>(
            r#"
            SELECT permissions.resource_type, permissions.action, permissions.scope
            FROM user_permission_overrides AS overrides
            INNER JOIN permissions ON permissions.id = overrides.permission_id
            WHERE overrides.user_id = $1
                AND overrides.is_active
                AND permissions.is_active
            ORDER BY permissions.resource_type, permissions.action, permissions.scope
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load permission overrides for '{user_id}': {error}"))
        })?
        .into_iter()
        .map(|row| decode_permission_key(row.resource_type, row.action, &row.scope))
        .collect::<AppResult<Vec<_>>>()?;

        let position_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT position_id
            FROM user_positions
            WHERE user_id = $1
            ORDER BY assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load positions for '{user_id}': {error}"))
        })?;

        let position_rows = sqlx::query_as::<_, KeyedPermissionRow>(
            r#"
            SELECT
                mapping.position_id AS owner_id,
                permissions.resource_type,
                permissions.action,
                permissions.scope
            FROM position_permissions AS mapping
            INNER JOIN permissions ON permissions.id = mapping.permission_id
            WHERE mapping.position_id = ANY($1)
                AND permissions.is_active
            ORDER BY permissions.resource_type, permissions.action, permissions.scope
            "#,
        )
        .bind(&position_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load position permissions: {error}"))
        })?;

        let mut by_position = group_by_owner(position_rows)?;
        let positions = position_ids
            .into_iter()
            .map(|position_id| PositionGrant {
                position_id: PositionId::from_uuid(position_id),
                permissions: by_position.remove(&position_id).unwrap_or_default(),
            })
            .collect();

        Ok(ActorGrantSources {
            placement,
            role_ids,
            overrides,
            positions,
        })
    }

    pub(super) async fn load_role_permissions_impl(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RolePermissions>> {
        let role_uuids = role_ids.iter().map(RoleId::as_uuid).collect::<Vec<_>>();
        let rows = sqlx::query_as::<_, KeyedPermissionRow>(
            r#"
            SELECT
                mapping.role_id AS owner_id,
                permissions.resource_type,
                permissions.action,
                permissions.scope
            FROM role_permissions AS mapping
            INNER JOIN permissions ON permissions.id = mapping.permission_id
            WHERE mapping.role_id = ANY($1)
                AND permissions.is_active
            ORDER BY mapping.granted_at, permissions.id
            "#,
        )
        .bind(&role_uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role permissions: {error}")))?;

        let mut by_role = group_by_owner(rows)?;
        Ok(role_uuids
            .into_iter()
            .map(|role_id| RolePermissions {
                role_id: RoleId::from_uuid(role_id),
                permissions: by_role.remove(&role_id).unwrap_or_default(),
            })
            .collect())
    }

    pub(super) async fn find_placement_impl(&self, user_id: UserId) -> AppResult<OrgPlacement> {
        let row = sqlx::query_as::<_, PlacementRow>(
            r#"
            SELECT team_id, department_id, branch_id
            FROM user_placements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load placement for '{user_id}': {error}"))
        })?;

        Ok(row.map(OrgPlacement::from).unwrap_or_default())
    }
}

fn group_by_owner(
    rows: Vec<KeyedPermissionRow>,
) -> AppResult<HashMap<uuid::Uuid, Vec<PermissionKey>>> {
    let mut grouped = HashMap::<uuid::Uuid, Vec<PermissionKey>>::new();
    for row in rows {
        let key = decode_permission_key(row.resource_type, row.action, &row.scope)?;
        grouped.entry(row.owner_id).or_default().push(key);
    }

    Ok(grouped)
}
