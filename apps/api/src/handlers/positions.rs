use crate::dto::{CreatePositionRequest, PositionPermissionRequest, PositionResponse};

use super::*;

pub async fn list_positions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<PositionResponse>>> {
    let positions = state
        .security_admin_service
        .list_positions(&actor)
        .await?
        .into_iter()
        .map(PositionResponse::from)
        .collect();

    Ok(Json(positions))
}

pub async fn create_position_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreatePositionRequest>,
) -> ApiResult<(StatusCode, Json<PositionResponse>)> {
    let position = state
        .security_admin_service
        .create_position(&actor, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(PositionResponse::from(position))))
}

pub async fn set_position_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(position_id): Path<String>,
    Json(payload): Json<PositionPermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .set_position_permission(
            &actor,
            parse_path::<PositionId>(&position_id)?,
            parse_path::<PermissionId>(&payload.permission_id)?,
            payload.granted,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
