use crate::dto::{
    CreateRoleFromTemplateRequest, CreateRoleRequest, MatrixToggleRequest, MatrixToggleResponse,
    PermissionMatrixResponse, PermissionResponse, RolePermissionRequest, RoleResponse,
    UpdateRoleRequest,
};

use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .security_admin_service
        .list_roles(&actor)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn list_standard_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .security_admin_service
        .list_standard_roles(&actor)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .security_admin_service
        .create_role(&actor, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn create_role_from_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateRoleFromTemplateRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .security_admin_service
        .create_role_from_template(&actor, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(role_id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .security_admin_service
        .update_role(&actor, parse_path(&role_id)?, payload.into_update()?)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(role_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .delete_role(&actor, parse_path(&role_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(role_id): Path<String>,
    Json(payload): Json<RolePermissionRequest>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .assign_permission(
            &actor,
            parse_path::<RoleId>(&role_id)?,
            parse_path::<PermissionId>(&payload.permission_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .revoke_permission(
            &actor,
            parse_path::<RoleId>(&role_id)?,
            parse_path::<PermissionId>(&permission_id)?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .security_admin_service
        .list_permissions(&actor)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn permission_matrix_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<PermissionMatrixResponse>> {
    let matrix = state
        .security_admin_service
        .permission_matrix(&actor)
        .await?;

    Ok(Json(PermissionMatrixResponse::from(matrix)))
}

pub async fn toggle_matrix_cell_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<MatrixToggleRequest>,
) -> ApiResult<Json<MatrixToggleResponse>> {
    let changed = state
        .security_admin_service
        .toggle_matrix_cell(&actor, payload.into_input()?)
        .await?;

    Ok(Json(MatrixToggleResponse { changed }))
}
