use std::sync::Arc;

use lendgate_core::{ActorIdentity, AppError, AppResult, UserId};
use lendgate_domain::{
    Decision, EffectiveGrant, EffectivePermissionSet, OrgPlacement, PermissionKey, RoleId,
    ScopeContext, WILDCARD,
};
use tracing::debug;

use crate::{AuthorizationRepository, RolePermissionCache};

/// Longest staleness the role permission cache may introduce.
pub const MAX_ROLE_CACHE_TTL_SECONDS: u32 = 30;

/// Effective permissions of one actor together with their placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActor {
    /// Actor identifier.
    pub user_id: UserId,
    /// Actor placement.
    pub placement: OrgPlacement,
    /// Merged grants.
    pub permissions: EffectivePermissionSet,
}

impl ResolvedActor {
    /// Evaluates one request against the resolved grants.
    #[must_use]
    pub fn evaluate(&self, resource_type: &str, action: &str, context: &ScopeContext) -> Decision {
        self.permissions.evaluate(
            self.user_id,
            &self.placement,
            resource_type,
            action,
            context,
        )
    }
}

/// Application service answering authorization questions.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
    role_cache: Option<Arc<dyn RolePermissionCache>>,
    role_cache_ttl_seconds: u32,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self {
            repository,
            role_cache: None,
            role_cache_ttl_seconds: 0,
        }
    }

    /// Serves role permission sets from `cache` for up to `ttl_seconds`.
    pub fn with_role_cache(
        mut self,
        cache: Arc<dyn RolePermissionCache>,
        ttl_seconds: u32,
    ) -> AppResult<Self> {
        if ttl_seconds > MAX_ROLE_CACHE_TTL_SECONDS {
            return Err(AppError::Validation(format!(
                "role cache ttl must be at most {MAX_ROLE_CACHE_TTL_SECONDS} seconds"
            )));
        }

        self.role_cache = Some(cache);
        self.role_cache_ttl_seconds = ttl_seconds;
        Ok(self)
    }

    /// Resolves the merged role, override and position grants of a user.
    pub async fn resolve_actor(&self, user_id: UserId) -> AppResult<ResolvedActor> {
        let sources = self.repository.load_grant_sources(user_id).await?;

        let mut permissions = EffectivePermissionSet::new();
        for (role_id, keys) in self.role_permissions(&sources.role_ids).await? {
            permissions.extend_from_role(role_id, keys);
        }
        permissions.extend_from_overrides(sources.overrides);
        for position in sources.positions {
            permissions.extend_from_position(position.position_id, position.permissions);
        }

        Ok(ResolvedActor {
            user_id,
            placement: sources.placement,
            permissions,
        })
    }

    /// Returns the effective permission set of a user.
    pub async fn effective_permissions(&self, user_id: UserId) -> AppResult<EffectivePermissionSet> {
        Ok(self.resolve_actor(user_id).await?.permissions)
    }

    /// Decides whether `actor` may perform `action` on `resource_type` in `context`.
    pub async fn authorize(
        &self,
        actor: UserId,
        resource_type: &str,
        action: &str,
        context: &ScopeContext,
    ) -> AppResult<Decision> {
        let resolved = self.resolve_actor(actor).await?;
        let decision = resolved.evaluate(resource_type, action, context);

        if !decision.is_allowed() {
            debug!(
                actor = %actor,
                resource_type,
                action,
                "authorization denied"
            );
        }

        Ok(decision)
    }

    /// Fails with `Unauthorized` unless the actor is allowed.
    pub async fn require(
        &self,
        actor: &ActorIdentity,
        resource_type: &str,
        action: &str,
        context: &ScopeContext,
    ) -> AppResult<EffectiveGrant> {
        match self
            .authorize(actor.user_id(), resource_type, action, context)
            .await?
        {
            Decision::Allow { matched } => Ok(matched),
            Decision::Deny => Err(AppError::Unauthorized(format!(
                "user '{}' may not {action} {resource_type}",
                actor.user_id()
            ))),
        }
    }

    /// Fails with `Unauthorized` unless the actor holds the permission at global scope.
    pub async fn require_global(
        &self,
        actor: &ActorIdentity,
        resource_type: &str,
        action: &str,
    ) -> AppResult<EffectiveGrant> {
        self.require(actor, resource_type, action, &ScopeContext::global())
            .await
    }

    /// Fails with `Unauthorized` unless the actor already holds each triple at the same or
    /// broader scope.
    pub async fn require_delegable(
        &self,
        actor: &ActorIdentity,
        keys: &[PermissionKey],
    ) -> AppResult<()> {
        let held = self.effective_permissions(actor.user_id()).await?;
        match keys.iter().find(|key| !held.covers_key(key)) {
            Some(key) => {
                debug!(actor = %actor.user_id(), permission = %key, "delegation denied");
                Err(AppError::Unauthorized(format!(
                    "user '{}' may not hand out '{key}' without holding it",
                    actor.user_id()
                )))
            }
            None => Ok(()),
        }
    }

    /// Returns whether the user holds the all-resources, all-actions global grant.
    pub async fn is_administrator(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self
            .authorize(user_id, WILDCARD, WILDCARD, &ScopeContext::global())
            .await?
            .is_allowed())
    }

    /// Returns the placement of a user.
    pub async fn placement_of(&self, user_id: UserId) -> AppResult<OrgPlacement> {
        self.repository.find_placement(user_id).await
    }

    /// Drops cached role permission sets after a role, permission or template mutation.
    pub async fn invalidate_role_cache(&self) -> AppResult<()> {
        match &self.role_cache {
            Some(cache) => cache.invalidate_all().await,
            None => Ok(()),
        }
    }

    async fn role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, Vec<PermissionKey>)>> {
        let Some(cache) = self
            .role_cache
            .as_ref()
            .filter(|_| self.role_cache_ttl_seconds > 0)
        else {
            return Ok(self
                .repository
                .load_role_permissions(role_ids)
                .await?
                .into_iter()
                .map(|role| (role.role_id, role.permissions))
                .collect());
        };

        let mut resolved = Vec::with_capacity(role_ids.len());
        let mut missing = Vec::new();
        for role_id in role_ids {
            match cache.get_role_permissions(*role_id).await? {
                Some(keys) => resolved.push((*role_id, keys)),
                None => missing.push(*role_id),
            }
        }

        if !missing.is_empty() {
            for role in self.repository.load_role_permissions(&missing).await? {
                cache
                    .set_role_permissions(
                        role.role_id,
                        role.permissions.clone(),
                        self.role_cache_ttl_seconds,
                    )
                    .await?;
                resolved.push((role.role_id, role.permissions));
            }
        }

        Ok(resolved)
    }
}
