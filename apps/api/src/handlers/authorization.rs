use crate::dto::{AuthorizeRequest, AuthorizeResponse};

use super::*;

/// Evaluates a permission question for the calling actor.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let context = payload.scope_context()?;
    let decision = state
        .authorization_service
        .authorize(
            actor.user_id(),
            payload.resource_type.as_str(),
            payload.action.as_str(),
            &context,
        )
        .await?;

    Ok(Json(AuthorizeResponse::from(decision)))
}
