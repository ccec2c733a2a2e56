//! Redis-backed role permission cache.
//!
//! Redis is an accelerator only: connection and command failures are logged
//! and reported as cache misses so evaluation falls back to PostgreSQL.

use async_trait::async_trait;
use lendgate_application::RolePermissionCache;
use lendgate_core::AppResult;
use lendgate_domain::{PermissionKey, RoleId};
use redis::AsyncCommands;
use tracing::warn;

/// Redis implementation of the role permission cache port.
#[derive(Clone)]
pub struct RedisRolePermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRolePermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:role_permissions:generation", self.key_prefix)
    }

    fn entry_key(&self, generation: u64, role_id: RoleId) -> String {
        format!(
            "{}:role_permissions:{generation}:{role_id}",
            self.key_prefix
        )
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(connection) => Some(connection),
            Err(error) => {
                warn!(error = %error, "role permission cache unavailable");
                None
            }
        }
    }

    async fn generation(
        &self,
        connection: &mut redis::aio::MultiplexedConnection,
    ) -> Option<u64> {
        let generation: Result<Option<u64>, _> = connection.get(self.generation_key()).await;
        match generation {
            Ok(generation) => Some(generation.unwrap_or_default()),
            Err(error) => {
                warn!(error = %error, "failed to read role permission cache generation");
                None
            }
        }
    }
}

#[async_trait]
impl RolePermissionCache for RedisRolePermissionCache {
    async fn get_role_permissions(&self, role_id: RoleId) -> AppResult<Option<Vec<PermissionKey>>> {
        let Some(mut connection) = self.connection().await else {
            return Ok(None);
        };
        let Some(generation) = self.generation(&mut connection).await else {
            return Ok(None);
        };

        let encoded: Option<String> = match connection.get(self.entry_key(generation, role_id)).await
        {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(error = %error, role_id = %role_id, "failed to read role permission cache entry");
                return Ok(None);
            }
        };

        let Some(encoded) = encoded else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<PermissionKey>>(&encoded) {
            Ok(permissions) => Ok(Some(permissions)),
            Err(error) => {
                warn!(error = %error, role_id = %role_id, "discarding undecodable role permission cache entry");
                Ok(None)
            }
        }
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

        let encoded = match serde_json::to_string(&permissions) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(error = %error, role_id = %role_id, "failed to encode role permission cache entry");
                return Ok(());
            }
        };
        let Some(mut connection) = self.connection().await else {
            return Ok(());
        };
        let Some(generation) = self.generation(&mut connection).await else {
            return Ok(());
        };

        let written: Result<(), _> = connection
            .set_ex(
                self.entry_key(generation, role_id),
                encoded,
                u64::from(ttl_seconds),
            )
            .await;
        if let Err(error) = written {
            warn!(error = %error, role_id = %role_id, "failed to write role permission cache entry");
        }

        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        let Some(mut connection) = self.connection().await else {
            return Ok(());
        };

        // Entries under older generations are never read again and expire on their own ttl.
        let bumped: Result<u64, _> = connection.incr(self.generation_key(), 1_u64).await;
        if let Err(error) = bumped {
            warn!(error = %error, "failed to invalidate role permission cache");
        }

        Ok(())
    }
}
