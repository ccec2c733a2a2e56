use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use lendgate_core::{ActorIdentity, AppError, UserId};
use lendgate_domain::{PermissionId, PositionId, RoleId, TemplateId};

use crate::error::ApiResult;
use crate::state::AppState;

pub mod applications;
pub mod audit;
pub mod authorization;
pub mod health;
pub mod positions;
pub mod roles;
pub mod templates;
pub mod users;

/// Parses an identifier taken from the request path.
fn parse_path<T>(value: &str) -> ApiResult<T>
where
    T: FromStr<Err = AppError>,
{
    Ok(T::from_str(value)?)
}
