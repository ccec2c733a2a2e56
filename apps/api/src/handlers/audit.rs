use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use lendgate_application::{AUDIT_MAX_PAGE_SIZE, AuditExportFormat};
use tracing::warn;

use crate::dto::{AuditLogPageResponse, AuditLogQueryParams};

use super::*;

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(params): Query<AuditLogQueryParams>,
) -> ApiResult<Json<AuditLogPageResponse>> {
    let page = params.page();
    let page_size = params.page_size().clamp(1, AUDIT_MAX_PAGE_SIZE);
    let entries = state
        .audit_log_service
        .query(&actor, params.filter()?, page, page_size)
        .await?;

    Ok(Json(AuditLogPageResponse::new(entries, page, page_size)))
}

pub async fn export_audit_log_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(params): Query<AuditLogQueryParams>,
) -> ApiResult<Response> {
    let format = params
        .format
        .as_deref()
        .unwrap_or("csv")
        .parse::<AuditExportFormat>()?;
    let chunks = state
        .audit_log_service
        .export(&actor, params.filter()?, format)
        .await?;

    // Headers are already sent when a later batch fails; the body is cut short.
    let body = Body::from_stream(chunks.inspect_err(|error| {
        warn!(error = %error, "audit export aborted");
    }));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"audit-log.{}\"",
        format.extension()
    ))
    .map_err(|error| AppError::Internal(format!("invalid export file name: {error}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
