use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lendgate_application::RolePermissionCache;
use lendgate_core::AppResult;
use lendgate_domain::{PermissionKey, RoleId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct RolePermissionCacheEntry {
    permissions: Vec<PermissionKey>,
    expires_at: Instant,
}

/// In-process cache adapter for role permission sets.
#[derive(Default)]
pub struct InMemoryRolePermissionCache {
    entries: RwLock<HashMap<RoleId, RolePermissionCacheEntry>>,
}

impl InMemoryRolePermissionCache {
    /// Creates an empty in-memory role permission cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RolePermissionCache for InMemoryRolePermissionCache {
    async fn get_role_permissions(&self, role_id: RoleId) -> AppResult<Option<Vec<PermissionKey>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(&role_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.permissions.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&role_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&role_id);
        }

        Ok(None)
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<PermissionKey>,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        self.entries.write().await.insert(
            role_id,
            RolePermissionCacheEntry {
                permissions,
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lendgate_application::RolePermissionCache;
    use lendgate_domain::{PermissionKey, RoleId, Scope};

    use super::InMemoryRolePermissionCache;

    fn key(action: &str) -> PermissionKey {
        match PermissionKey::new("application", action, Scope::Branch) {
            Ok(key) => key,
            Err(error) => panic!("invalid test key: {error}"),
        }
    }

    #[tokio::test]
    async fn stored_sets_are_returned_until_invalidated() {
        let cache = InMemoryRolePermissionCache::new();
        let role_id = RoleId::new();

        assert!(matches!(cache.get_role_permissions(role_id).await, Ok(None)));
        assert!(
            cache
                .set_role_permissions(role_id, vec![key("read"), key("process")], 30)
                .await
                .is_ok()
        );
        assert!(matches!(
            cache.get_role_permissions(role_id).await,
            Ok(Some(permissions)) if permissions == vec![key("read"), key("process")]
        ));

        assert!(cache.invalidate_all().await.is_ok());
        assert!(matches!(cache.get_role_permissions(role_id).await, Ok(None)));
    }

    #[tokio::test]
    async fn zero_ttl_is_not_cached() {
        let cache = InMemoryRolePermissionCache::new();
        let role_id = RoleId::new();

        assert!(
            cache
                .set_role_permissions(role_id, vec![key("read")], 0)
                .await
                .is_ok()
        );
        assert!(matches!(cache.get_role_permissions(role_id).await, Ok(None)));
    }
}
