use lendgate_application::{CreatePositionInput, PositionCapabilities};
use lendgate_domain::Position;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::PermissionKeyDto;

/// API representation of a position and its capability map.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/position-response.ts"
)]
pub struct PositionResponse {
    pub position_id: String,
    pub code: String,
    pub title: String,
    pub permissions: Vec<PermissionKeyDto>,
}

/// Incoming payload for position creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-position-request.ts"
)]
pub struct CreatePositionRequest {
    pub code: String,
    pub title: String,
}

/// Incoming payload for assigning a position to a user.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assign-position-request.ts"
)]
pub struct AssignPositionRequest {
    pub position_id: String,
}

/// Incoming payload for one position capability change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/position-permission-request.ts"
)]
pub struct PositionPermissionRequest {
    pub permission_id: String,
    pub granted: bool,
}

impl From<PositionCapabilities> for PositionResponse {
    fn from(value: PositionCapabilities) -> Self {
        Self {
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionKeyDto::from)
                .collect(),
            ..Self::from(value.position)
        }
    }
}

impl From<Position> for PositionResponse {
    fn from(value: Position) -> Self {
        Self {
            position_id: value.position_id.to_string(),
            code: value.code,
            title: value.title,
            permissions: Vec::new(),
        }
    }
}

impl From<CreatePositionRequest> for CreatePositionInput {
    fn from(value: CreatePositionRequest) -> Self {
        Self {
            code: value.code,
            title: value.title,
        }
    }
}
