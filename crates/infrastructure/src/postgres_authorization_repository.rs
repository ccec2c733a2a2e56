use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use lendgate_application::{
    ActorGrantSources, AuthorizationRepository, PositionGrant, RolePermissions,
};
use lendgate_core::{AppError, AppResult, UserId};
use lendgate_domain::{
    BranchId, DepartmentId, OrgPlacement, PermissionKey, PositionId, RoleId, Scope, TeamId,
};
use sqlx::{FromRow, PgPool};

mod grant_sources;

/// PostgreSQL-backed repository for effective permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PlacementRow {
    pub(crate) team_id: Option<uuid::Uuid>,
    pub(crate) department_id: Option<uuid::Uuid>,
    pub(crate) branch_id: Option<uuid::Uuid>,
}

impl From<PlacementRow> for OrgPlacement {
    fn from(row: PlacementRow) -> Self {
        Self {
            team_id: row.team_id.map(TeamId::from_uuid),
            department_id: row.department_id.map(DepartmentId::from_uuid),
            branch_id: row.branch_id.map(BranchId::from_uuid),
        }
    }
}

#[derive(Debug, FromRow)]
struct KeyedPermissionRow {
    owner_id: uuid::Uuid,
    resource_type: String,
    action: String,
    scope: String,
}

#[derive(Debug, FromRow)]
struct PermissionTripleRow {
    resource_type: String,
    action: String,
    scope: String,
}

pub(crate) fn decode_permission_key(
    resource_type: String,
    action: String,
    scope: &str,
) -> AppResult<PermissionKey> {
    let scope = Scope::from_str(scope).map_err(|error| {
        AppError::Internal(format!("failed to decode stored scope '{scope}': {error}"))
    })?;
    PermissionKey::new(resource_type, action, scope).map_err(|error| {
        AppError::Internal(format!("failed to decode stored permission: {error}"))
    })
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn load_grant_sources(&self, user_id: UserId) -> AppResult<ActorGrantSources> {
        self.load_grant_sources_impl(user_id).await
    }

    async fn load_role_permissions(&self, role_ids: &[RoleId]) -> AppResult<Vec<RolePermissions>> {
        self.load_role_permissions_impl(role_ids).await
    }

    async fn find_placement(&self, user_id: UserId) -> AppResult<OrgPlacement> {
        self.find_placement_impl(user_id).await
    }
}
