use lendgate_core::UserId;
use serde::{Deserialize, Serialize};

use crate::{OrgPlacement, PermissionKey, PositionId, RoleId, Scope, ScopeContext};

/// Grant path through which a permission reached an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GrantSource {
    /// Granted by an active role assignment.
    Role(RoleId),
    /// Granted directly to the user.
    Override,
    /// Granted through an organizational position.
    Position(PositionId),
}

/// One permission held by an actor together with its grant path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveGrant {
    /// Granted triple.
    pub key: PermissionKey,
    /// Path that granted it.
    pub source: GrantSource,
}

/// Authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Access granted by the matched grant.
    Allow {
        /// Broadest grant that satisfied the request.
        matched: EffectiveGrant,
    },
    /// No held grant is broad enough.
    Deny,
}

impl Decision {
    /// Returns whether access is granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Returns the matched grant for allowed decisions.
    #[must_use]
    pub fn matched(&self) -> Option<&EffectiveGrant> {
        match self {
            Self::Allow { matched } => Some(matched),
            Self::Deny => None,
        }
    }
}

/// Union of every permission reachable by one actor.
///
/// Roles, direct overrides and positions are merged here before evaluation so
/// that all grant paths share a single decision procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissionSet {
    grants: Vec<EffectiveGrant>,
}

impl EffectivePermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every permission of an active role.
    pub fn extend_from_role(
        &mut self,
        role_id: RoleId,
        permissions: impl IntoIterator<Item = PermissionKey>,
    ) {
        self.extend(GrantSource::Role(role_id), permissions);
    }

    /// Adds active direct overrides.
    pub fn extend_from_overrides(&mut self, permissions: impl IntoIterator<Item = PermissionKey>) {
        self.extend(GrantSource::Override, permissions);
    }

    /// Adds permissions mapped to an assigned position.
    pub fn extend_from_position(
        &mut self,
        position_id: PositionId,
        permissions: impl IntoIterator<Item = PermissionKey>,
    ) {
        self.extend(GrantSource::Position(position_id), permissions);
    }

    /// Returns every grant with its source.
    #[must_use]
    pub fn grants(&self) -> &[EffectiveGrant] {
        self.grants.as_slice()
    }

    /// Returns distinct triples held, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<PermissionKey> {
        let mut keys = self
            .grants
            .iter()
            .map(|grant| grant.key.clone())
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Returns whether no grant is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Decides whether the actor may perform `action` on `resource_type` in `context`.
    #[must_use]
    pub fn evaluate(
        &self,
        actor: UserId,
        placement: &OrgPlacement,
        resource_type: &str,
        action: &str,
        context: &ScopeContext,
    ) -> Decision {
        let required = context.required_scope(actor, placement);

        self.covering_grant(resource_type, action, required)
            .map(|grant| Decision::Allow {
                matched: grant.clone(),
            })
            .unwrap_or(Decision::Deny)
    }

    /// Returns whether a held grant allows everything `key` allows.
    ///
    /// Wildcard segments in `key` are only covered by wildcard grants.
    #[must_use]
    pub fn covers_key(&self, key: &PermissionKey) -> bool {
        self.covering_grant(key.resource_type(), key.action(), key.scope())
            .is_some()
    }

    fn covering_grant(
        &self,
        resource_type: &str,
        action: &str,
        required: Scope,
    ) -> Option<&EffectiveGrant> {
        self.grants
            .iter()
            .filter(|grant| grant.key.applies_to(resource_type, action))
            .max_by_key(|grant| grant.key.scope())
            .filter(|grant| grant.key.scope().covers(required))
    }

    fn extend(&mut self, source: GrantSource, permissions: impl IntoIterator<Item = PermissionKey>) {
        for key in permissions {
            let duplicate = self
                .grants
                .iter()
                .any(|grant| grant.source == source && grant.key == key);
            if !duplicate {
                self.grants.push(EffectiveGrant { key, source });
            }
        }
    }
}
