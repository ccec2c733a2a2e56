use lendgate_application::RoleAssignment;
use lendgate_core::{AppResult, UserId};
use lendgate_domain::{EffectivePermissionSet, OrgPlacement};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::{EffectiveGrantResponse, parse_optional_id};

/// Incoming payload for assigning a role to a user.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assign-user-role-request.ts"
)]
pub struct AssignUserRoleRequest {
    pub role_id: String,
}

/// API representation of a user role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub role_id: String,
    pub role_name: String,
    pub assigned_by: String,
    pub assigned_at: String,
    pub is_active: bool,
}

/// Incoming payload for granting or revoking a direct user permission.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-permission-request.ts"
)]
pub struct UserPermissionRequest {
    pub permission_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Incoming payload replacing a user's organizational placement.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-placement-request.ts"
)]
pub struct UpdatePlacementRequest {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// Merged permission set of one user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub grants: Vec<EffectiveGrantResponse>,
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            role_id: value.role_id.to_string(),
            role_name: value.role_name,
            assigned_by: value.assigned_by.to_string(),
            assigned_at: value.assigned_at.to_rfc3339(),
            is_active: value.is_active,
        }
    }
}

impl EffectivePermissionsResponse {
    pub fn new(user_id: UserId, permissions: EffectivePermissionSet) -> Self {
        Self {
            user_id: user_id.to_string(),
            grants: permissions
                .grants()
                .iter()
                .cloned()
                .map(EffectiveGrantResponse::from)
                .collect(),
        }
    }
}

impl UpdatePlacementRequest {
    pub fn into_placement(self) -> AppResult<OrgPlacement> {
        Ok(OrgPlacement {
            team_id: parse_optional_id(self.team_id.as_deref())?,
            department_id: parse_optional_id(self.department_id.as_deref())?,
            branch_id: parse_optional_id(self.branch_id.as_deref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use lendgate_domain::BranchId;

    use super::UpdatePlacementRequest;

    #[test]
    fn blank_placement_units_are_cleared() {
        let branch_id = BranchId::new();
        let Ok(placement) = UpdatePlacementRequest {
            team_id: Some(String::new()),
            department_id: None,
            branch_id: Some(branch_id.to_string()),
        }
        .into_placement() else {
            panic!("placement should parse");
        };

        assert_eq!(placement.team_id, None);
        assert_eq!(placement.department_id, None);
        assert_eq!(placement.branch_id, Some(branch_id));
    }
}
