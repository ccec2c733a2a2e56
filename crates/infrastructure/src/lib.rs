//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_role_permission_cache;
mod postgres_audit_log_repository;
mod postgres_authorization_repository;
mod postgres_loan_application_repository;
mod postgres_security_admin_repository;
mod postgres_transaction;
mod redis_role_permission_cache;

pub use in_memory_role_permission_cache::InMemoryRolePermissionCache;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_loan_application_repository::PostgresLoanApplicationRepository;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
pub use redis_role_permission_cache::RedisRolePermissionCache;
