use std::sync::Arc;

use lendgate_application::{
    AuditLogService, AuthorizationService, LoanWorkflowService, SecurityAdminService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub security_admin_service: SecurityAdminService,
    pub loan_workflow_service: LoanWorkflowService,
    pub audit_log_service: AuditLogService,
    pub gateway_shared_secret: Arc<str>,
}
