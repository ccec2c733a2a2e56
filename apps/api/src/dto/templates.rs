use lendgate_application::{CreateTemplateInput, TemplateApplication, TemplateImportResult};
use lendgate_core::{AppError, AppResult};
use lendgate_domain::{PermissionKey, PermissionTemplate, PortableTemplate, TemplateTarget};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::{PermissionKeyDto, parse_ids};

/// API representation of a permission template.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/template-response.ts"
)]
pub struct TemplateResponse {
    pub template_id: String,
    pub name: String,
    pub description: String,
    /// `system` or `custom`.
    pub kind: String,
    pub is_active: bool,
    pub usage_count: u32,
    pub permission_ids: Vec<String>,
}

/// Incoming payload for template creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-template-request.ts"
)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permission_ids: Vec<String>,
}

/// Environment-independent template file.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/portable-template-dto.ts"
)]
pub struct PortableTemplateDto {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub permissions: Vec<PermissionKeyDto>,
}

/// Query string of a template import.
#[derive(Debug, Default, Deserialize)]
pub struct ImportTemplateQuery {
    /// `create_new` (default) or `update_if_exists`.
    pub mode: Option<String>,
}

/// Outcome of a template import.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/template-import-response.ts"
)]
pub struct TemplateImportResponse {
    pub template: TemplateResponse,
    pub created: bool,
    /// Triples absent from the local catalog, skipped during import.
    pub unmapped_permissions: Vec<PermissionKeyDto>,
}

/// Outcome of applying a template to a user or role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/template-application-response.ts"
)]
pub struct TemplateApplicationResponse {
    pub template_id: String,
    pub target_type: String,
    pub target_id: String,
    /// Grants that did not exist before.
    pub granted_count: usize,
}

impl From<PermissionTemplate> for TemplateResponse {
    fn from(value: PermissionTemplate) -> Self {
        Self {
            template_id: value.template_id().to_string(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            kind: value.kind().as_str().to_owned(),
            is_active: value.is_active(),
            usage_count: value.usage_count(),
            permission_ids: value
                .permissions()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl From<PortableTemplate> for PortableTemplateDto {
    fn from(value: PortableTemplate) -> Self {
        Self {
            name: value.name,
            description: value.description,
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionKeyDto::from)
                .collect(),
        }
    }
}

impl TryFrom<PortableTemplateDto> for PortableTemplate {
    type Error = AppError;

    fn try_from(value: PortableTemplateDto) -> Result<Self, Self::Error> {
        Ok(Self {
            name: value.name,
            description: value.description,
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionKey::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

impl From<TemplateImportResult> for TemplateImportResponse {
    fn from(value: TemplateImportResult) -> Self {
        Self {
            template: value.template.into(),
            created: value.created,
            unmapped_permissions: value
                .unmapped_permissions
                .into_iter()
                .map(PermissionKeyDto::from)
                .collect(),
        }
    }
}

impl From<TemplateApplication> for TemplateApplicationResponse {
    fn from(value: TemplateApplication) -> Self {
        let (target_type, target_id) = match value.target {
            TemplateTarget::User(user_id) => ("user", user_id.to_string()),
            TemplateTarget::Role(role_id) => ("role", role_id.to_string()),
        };

        Self {
            template_id: value.template_id.to_string(),
            target_type: target_type.to_owned(),
            target_id,
            granted_count: value.granted_count,
        }
    }
}

impl CreateTemplateRequest {
    pub fn into_input(self) -> AppResult<CreateTemplateInput> {
        Ok(CreateTemplateInput {
            permission_ids: parse_ids(&self.permission_ids)?,
            name: self.name,
            description: self.description,
        })
    }
}
