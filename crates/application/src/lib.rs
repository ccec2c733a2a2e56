//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_log_service;
mod audit_ports;
mod authorization_ports;
mod authorization_service;
mod loan_workflow_service;
mod security_admin_ports;
mod security_admin_service;
mod workflow_ports;

#[cfg(test)]
mod test_support;

pub use audit_log_service::{AuditExportFormat, AuditExportStream, AuditLogService};
pub use audit_ports::{
    AUDIT_EXPORT_BATCH_SIZE, AUDIT_MAX_PAGE_SIZE, AuditEvent, AuditExportCursor, AuditLogEntry,
    AuditLogFilter, AuditLogPage, AuditLogQuery, AuditLogRepository,
};
pub use authorization_ports::{
    ActorGrantSources, AuthorizationRepository, PositionGrant, RolePermissionCache,
    RolePermissions,
};
pub use authorization_service::{
    AuthorizationService, MAX_ROLE_CACHE_TTL_SECONDS, ResolvedActor,
};
pub use loan_workflow_service::{CreateApplicationInput, LoanWorkflowService};
pub use security_admin_ports::{
    CreatePositionInput, CreateRoleFromTemplateInput, CreateRoleInput, CreateTemplateInput,
    MatrixToggleInput, PermissionMatrix, PositionCapabilities, RoleAssignment,
    SecurityAdminRepository, TemplateApplication, TemplateImportResult,
};
pub use security_admin_service::SecurityAdminService;
pub use workflow_ports::{LoanApplicationRepository, TransitionCommit};
