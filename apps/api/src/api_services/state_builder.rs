use std::sync::Arc;

use lendgate_application::{
    AuditLogService, AuthorizationService, LoanWorkflowService, RolePermissionCache,
    SecurityAdminService,
};
use lendgate_core::AppError;
use lendgate_infrastructure::{
    InMemoryRolePermissionCache, PostgresAuditLogRepository, PostgresAuthorizationRepository,
    PostgresLoanApplicationRepository, PostgresSecurityAdminRepository, RedisRolePermissionCache,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

const ROLE_CACHE_KEY_PREFIX: &str = "lendgate";

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let authorization_service =
        AuthorizationService::new(Arc::new(PostgresAuthorizationRepository::new(pool.clone())))
            .with_role_cache(build_role_cache(config)?, config.role_cache_ttl_seconds)?;

    Ok(AppState {
        security_admin_service: SecurityAdminService::new(
            authorization_service.clone(),
            Arc::new(PostgresSecurityAdminRepository::new(pool.clone())),
        ),
        loan_workflow_service: LoanWorkflowService::new(
            authorization_service.clone(),
            Arc::new(PostgresLoanApplicationRepository::new(pool.clone())),
        ),
        audit_log_service: AuditLogService::new(
            authorization_service.clone(),
            Arc::new(PostgresAuditLogRepository::new(pool)),
        ),
        authorization_service,
        gateway_shared_secret: Arc::from(config.gateway_shared_secret.as_str()),
    })
}

fn build_role_cache(config: &ApiConfig) -> Result<Arc<dyn RolePermissionCache>, AppError> {
    match config.redis_url.as_deref() {
        Some(redis_url) => {
            info!(
                ttl_seconds = config.role_cache_ttl_seconds,
                "role permission cache backed by redis"
            );
            Ok(Arc::new(RedisRolePermissionCache::new(
                build_redis_client(redis_url)?,
                ROLE_CACHE_KEY_PREFIX,
            )))
        }
        None => {
            info!(
                ttl_seconds = config.role_cache_ttl_seconds,
                "role permission cache held in process"
            );
            Ok(Arc::new(InMemoryRolePermissionCache::new()))
        }
    }
}
