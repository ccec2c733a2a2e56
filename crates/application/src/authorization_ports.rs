use async_trait::async_trait;
use lendgate_core::{AppResult, UserId};
use lendgate_domain::{OrgPlacement, PermissionKey, PositionId, RoleId};

/// Permissions mapped to one position held by an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionGrant {
    /// Assigned position.
    pub position_id: PositionId,
    /// Active permissions mapped to the position.
    pub permissions: Vec<PermissionKey>,
}

/// Raw grant paths of one actor, before merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorGrantSources {
    /// Actor organizational placement.
    pub placement: OrgPlacement,
    /// Active roles held through active assignments.
    pub role_ids: Vec<RoleId>,
    /// Active permissions granted directly.
    pub overrides: Vec<PermissionKey>,
    /// Positions held with their active capability map.
    pub positions: Vec<PositionGrant>,
}

/// Active permissions of one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissions {
    /// Role identifier.
    pub role_id: RoleId,
    /// Active permissions in role order.
    pub permissions: Vec<PermissionKey>,
}

/// Repository port for evaluator inputs.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Loads the grant paths of a user. Inactive roles and assignments are excluded.
    async fn load_grant_sources(&self, user_id: UserId) -> AppResult<ActorGrantSources>;

    /// Loads active permissions for each requested role.
    async fn load_role_permissions(&self, role_ids: &[RoleId]) -> AppResult<Vec<RolePermissions>>;

    /// Returns the placement of a user; users without placement get an empty one.
    async fn find_placement(&self, user_id: UserId) -> AppResult<OrgPlacement>;
}

/// Optional short-lived cache of role permission sets.
#[async_trait]
pub trait RolePermissionCache: Send + Sync {
    /// Returns cached permissions for one role.
    async fn get_role_permissions(&self, role_id: RoleId) -> AppResult<Option<Vec<PermissionKey>>>;

    /// Stores permissions for one role with ttl.
    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<PermissionKey>,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops every cached role.
    async fn invalidate_all(&self) -> AppResult<()>;
}
