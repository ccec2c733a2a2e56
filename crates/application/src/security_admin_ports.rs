mod positions;
mod repositories;
mod roles;
mod templates;

pub use positions::{CreatePositionInput, PositionCapabilities};
pub use repositories::SecurityAdminRepository;
pub use roles::{
    CreateRoleFromTemplateInput, CreateRoleInput, MatrixToggleInput, PermissionMatrix,
    RoleAssignment,
};
pub use templates::{CreateTemplateInput, TemplateApplication, TemplateImportResult};
