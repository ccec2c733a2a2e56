use std::str::FromStr;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use lendgate_core::{ActorIdentity, AppError, AppResult, UserId};

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the authenticated user id forwarded by the gateway.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const BEARER_PREFIX: &str = "Bearer ";

pub async fn require_gateway_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = actor_identity_from_headers(request.headers(), &state.gateway_shared_secret)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn actor_identity_from_headers(headers: &HeaderMap, shared_secret: &str) -> AppResult<ActorIdentity> {
    let token = header_str(headers, header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| AppError::Unauthenticated("gateway credentials required".to_owned()))?;
    if !constant_time_eq(token.trim().as_bytes(), shared_secret.as_bytes()) {
        return Err(AppError::Unauthenticated(
            "gateway credentials rejected".to_owned(),
        ));
    }

    let actor_id = header_str(headers, ACTOR_ID_HEADER)
        .ok_or_else(|| AppError::Unauthenticated("actor id header required".to_owned()))?;
    let user_id = UserId::from_str(actor_id)
        .map_err(|_| AppError::Unauthenticated("actor id must be a uuid".to_owned()))?;

    let ip_address = header_str(headers, FORWARDED_FOR_HEADER)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    Ok(ActorIdentity::new(user_id, ip_address))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .zip(right.iter())
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}
