mod applications;
mod audit;
mod authorization;
mod common;
mod positions;
mod roles;
mod templates;
mod users;

pub use applications::{
    ApprovalTermsResponse, CreateApplicationRequest, LoanApplicationResponse, TransitionRequest,
};
pub use audit::{AuditLogEntryResponse, AuditLogPageResponse, AuditLogQueryParams};
pub use authorization::{AuthorizeRequest, AuthorizeResponse};
pub use common::{EffectiveGrantResponse, HealthResponse, PermissionKeyDto};
pub use positions::{
    AssignPositionRequest, CreatePositionRequest, PositionPermissionRequest, PositionResponse,
};
pub use roles::{
    CreateRoleFromTemplateRequest, CreateRoleRequest, MatrixToggleRequest, MatrixToggleResponse,
    PermissionMatrixResponse, PermissionResponse, RolePermissionRequest, RoleResponse,
    UpdateRoleRequest,
};
pub use templates::{
    CreateTemplateRequest, ImportTemplateQuery, PortableTemplateDto, TemplateApplicationResponse,
    TemplateImportResponse, TemplateResponse,
};
pub use users::{
    AssignUserRoleRequest, EffectivePermissionsResponse, RoleAssignmentResponse,
    UpdatePlacementRequest, UserPermissionRequest,
};

#[cfg(test)]
mod tests {
    use super::{
        ApprovalTermsResponse, AssignPositionRequest, AssignUserRoleRequest, AuditLogEntryResponse,
        AuditLogPageResponse, AuthorizeRequest, AuthorizeResponse, CreateApplicationRequest,
        CreatePositionRequest, CreateRoleFromTemplateRequest, CreateRoleRequest,
        CreateTemplateRequest, EffectiveGrantResponse, EffectivePermissionsResponse,
        HealthResponse, LoanApplicationResponse, MatrixToggleRequest, MatrixToggleResponse,
        PermissionKeyDto, PermissionMatrixResponse, PermissionResponse, PortableTemplateDto,
        PositionPermissionRequest, PositionResponse, RoleAssignmentResponse,
        RolePermissionRequest, RoleResponse, TemplateApplicationResponse, TemplateImportResponse,
        TemplateResponse, TransitionRequest, UpdatePlacementRequest, UpdateRoleRequest,
        UserPermissionRequest,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        HealthResponse::export(&config)?;
        ErrorResponse::export(&config)?;
        PermissionKeyDto::export(&config)?;
        EffectiveGrantResponse::export(&config)?;
        PermissionResponse::export(&config)?;
        RoleResponse::export(&config)?;
        CreateRoleRequest::export(&config)?;
        CreateRoleFromTemplateRequest::export(&config)?;
        UpdateRoleRequest::export(&config)?;
        RolePermissionRequest::export(&config)?;
        PermissionMatrixResponse::export(&config)?;
        MatrixToggleRequest::export(&config)?;
        MatrixToggleResponse::export(&config)?;
        TemplateResponse::export(&config)?;
        CreateTemplateRequest::export(&config)?;
        PortableTemplateDto::export(&config)?;
        TemplateImportResponse::export(&config)?;
        TemplateApplicationResponse::export(&config)?;
        AssignUserRoleRequest::export(&config)?;
        RoleAssignmentResponse::export(&config)?;
        UserPermissionRequest::export(&config)?;
        UpdatePlacementRequest::export(&config)?;
        EffectivePermissionsResponse::export(&config)?;
        PositionResponse::export(&config)?;
        CreatePositionRequest::export(&config)?;
        AssignPositionRequest::export(&config)?;
        PositionPermissionRequest::export(&config)?;
        AuthorizeRequest::export(&config)?;
        AuthorizeResponse::export(&config)?;
        CreateApplicationRequest::export(&config)?;
        TransitionRequest::export(&config)?;
        ApprovalTermsResponse::export(&config)?;
        LoanApplicationResponse::export(&config)?;
        AuditLogEntryResponse::export(&config)?;
        AuditLogPageResponse::export(&config)?;

        Ok(())
    }
}
