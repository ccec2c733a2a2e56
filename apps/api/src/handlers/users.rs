use crate::dto::{
    AssignPositionRequest, AssignUserRoleRequest, EffectivePermissionsResponse,
    RoleAssignmentResponse, UpdatePlacementRequest, UserPermissionRequest,
};

use super::*;

pub async fn list_user_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .security_admin_service
        .list_user_roles(&actor, parse_path::<UserId>(&user_id)?)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_user_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<AssignUserRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .assign_role_to_user(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<RoleId>(&payload.role_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_user_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((user_id, role_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .revoke_role_from_user(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<RoleId>(&role_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_user_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<UserPermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .grant_user_permission(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<PermissionId>(&payload.permission_id)?,
            payload.reason,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_user_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<UserPermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .revoke_user_permission(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<PermissionId>(&payload.permission_id)?,
            payload.reason,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_effective_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let user_id = parse_path::<UserId>(&user_id)?;
    let permissions = state
        .security_admin_service
        .user_effective_permissions(&actor, user_id)
        .await?;

    Ok(Json(EffectivePermissionsResponse::new(user_id, permissions)))
}

pub async fn update_user_placement_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdatePlacementRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .update_user_placement(
            &actor,
            parse_path::<UserId>(&user_id)?,
            payload.into_placement()?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_user_position_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<AssignPositionRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .assign_position(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<PositionId>(&payload.position_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_user_position_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((user_id, position_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .unassign_position(
            &actor,
            parse_path::<UserId>(&user_id)?,
            parse_path::<PositionId>(&position_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
