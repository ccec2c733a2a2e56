use lendgate_application::{
    CreateRoleFromTemplateInput, CreateRoleInput, MatrixToggleInput, PermissionMatrix,
};
use lendgate_core::AppResult;
use lendgate_domain::{PermissionDefinition, RoleDefinition, RoleUpdate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::{PermissionKeyDto, parse_ids, parse_optional_id};

/// API representation of a permission catalog entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub permission: PermissionKeyDto,
    pub description: Option<String>,
    pub is_active: bool,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub display_name: String,
    pub level: i32,
    pub parent_role_id: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    /// Granted catalog entries in grant order.
    pub permission_ids: Vec<String>,
}

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub parent_role_id: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<String>,
}

/// Incoming payload for role creation seeded from a template.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-from-template-request.ts"
)]
pub struct CreateRoleFromTemplateRequest {
    pub template_id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub parent_role_id: Option<String>,
}

/// Incoming payload for partial role updates.
///
/// `parent_role_id` sets a new parent; `clear_parent` detaches the role and
/// wins over `parent_role_id`.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub parent_role_id: Option<String>,
    #[serde(default)]
    pub clear_parent: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Incoming payload for granting a catalog entry to a role.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-permission-request.ts"
)]
pub struct RolePermissionRequest {
    pub permission_id: String,
}

/// Role × permission grid.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-matrix-response.ts"
)]
pub struct PermissionMatrixResponse {
    pub permissions: Vec<PermissionResponse>,
    pub roles: Vec<RoleResponse>,
}

/// Incoming payload for one matrix cell change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/matrix-toggle-request.ts"
)]
pub struct MatrixToggleRequest {
    pub role_id: String,
    pub permission_id: String,
    pub granted: bool,
}

/// Outcome of a matrix cell change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/matrix-toggle-response.ts"
)]
pub struct MatrixToggleResponse {
    /// False when the cell already had the requested value.
    pub changed: bool,
}

impl From<PermissionDefinition> for PermissionResponse {
    fn from(value: PermissionDefinition) -> Self {
        Self {
            permission_id: value.permission_id.to_string(),
            permission: value.key.into(),
            description: value.description,
            is_active: value.is_active,
        }
    }
}

impl From<RoleDefinition> for RoleResponse {
    fn from(value: RoleDefinition) -> Self {
        Self {
            role_id: value.role_id().to_string(),
            name: value.name().to_owned(),
            display_name: value.display_name().to_owned(),
            level: value.level(),
            parent_role_id: value.parent_role_id().map(|role_id| role_id.to_string()),
            is_system: value.is_system(),
            is_active: value.is_active(),
            permission_ids: value
                .permissions()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl From<PermissionMatrix> for PermissionMatrixResponse {
    fn from(value: PermissionMatrix) -> Self {
        Self {
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
            roles: value.roles.into_iter().map(RoleResponse::from).collect(),
        }
    }
}

impl CreateRoleRequest {
    pub fn into_input(self) -> AppResult<CreateRoleInput> {
        Ok(CreateRoleInput {
            parent_role_id: parse_optional_id(self.parent_role_id.as_deref())?,
            permission_ids: parse_ids(&self.permission_ids)?,
            name: self.name,
            display_name: self.display_name,
            level: self.level,
        })
    }
}

impl CreateRoleFromTemplateRequest {
    pub fn into_input(self) -> AppResult<CreateRoleFromTemplateInput> {
        Ok(CreateRoleFromTemplateInput {
            template_id: self.template_id.parse()?,
            parent_role_id: parse_optional_id(self.parent_role_id.as_deref())?,
            name: self.name,
            display_name: self.display_name,
            level: self.level,
        })
    }
}

impl UpdateRoleRequest {
    pub fn into_update(self) -> AppResult<RoleUpdate> {
        let parent_role_id = if self.clear_parent {
            Some(None)
        } else {
            parse_optional_id(self.parent_role_id.as_deref())?.map(Some)
        };

        Ok(RoleUpdate {
            display_name: self.display_name,
            level: self.level,
            parent_role_id,
            is_active: self.is_active,
        })
    }
}

impl MatrixToggleRequest {
    pub fn into_input(self) -> AppResult<MatrixToggleInput> {
        Ok(MatrixToggleInput {
            role_id: self.role_id.parse()?,
            permission_id: self.permission_id.parse()?,
            granted: self.granted,
        })
    }
}

#[cfg(test)]
mod tests {
    use lendgate_core::AppError;
    use lendgate_domain::RoleId;

    use super::{CreateRoleRequest, UpdateRoleRequest};

    #[test]
    fn update_distinguishes_clearing_from_leaving_the_parent() {
        let Ok(untouched) = UpdateRoleRequest::default().into_update() else {
            panic!("empty update should parse");
        };
        assert_eq!(untouched.parent_role_id, None);

        let Ok(cleared) = UpdateRoleRequest {
            clear_parent: true,
            parent_role_id: Some(RoleId::new().to_string()),
            ..UpdateRoleRequest::default()
        }
        .into_update() else {
            panic!("clearing update should parse");
        };
        assert_eq!(cleared.parent_role_id, Some(None));

        let parent = RoleId::new();
        let Ok(reparented) = UpdateRoleRequest {
            parent_role_id: Some(parent.to_string()),
            ..UpdateRoleRequest::default()
        }
        .into_update() else {
            panic!("reparenting update should parse");
        };
        assert_eq!(reparented.parent_role_id, Some(Some(parent)));
    }

    #[test]
    fn create_role_rejects_malformed_permission_ids() {
        let request = CreateRoleRequest {
            name: "loan_officer".to_owned(),
            display_name: "Loan Officer".to_owned(),
            level: 2,
            parent_role_id: None,
            permission_ids: vec!["application:read".to_owned()],
        };

        assert!(matches!(request.into_input(), Err(AppError::Validation(_))));
    }
}
