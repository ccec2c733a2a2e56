use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lendgate_core::AppError;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    code: String,
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) | AppError::SystemRoleProtected(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::InvalidTransition(_)
            | AppError::DuplicateAccountIdentifier(_) => StatusCode::CONFLICT,
            AppError::MissingPayload(_)
            | AppError::CyclicHierarchy(_)
            | AppError::InvalidTemplate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log.
        let message = match &self.0 {
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                "internal server error".to_owned()
            }
            other => other.to_string(),
        };

        let payload = Json(ErrorResponse {
            code: self.0.code().to_owned(),
            message,
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use lendgate_core::AppError;

    use super::ApiError;

    fn status_of(error: AppError) -> StatusCode {
        ApiError::from(error).into_response().status()
    }

    #[test]
    fn workflow_errors_map_to_stable_statuses() {
        assert_eq!(
            status_of(AppError::MissingPayload("reason".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::InvalidTransition("DRAFT -> APPROVED".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::DuplicateAccountIdentifier("ACC-1".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Conflict("stale version".to_owned())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn security_errors_map_to_stable_statuses() {
        assert_eq!(
            status_of(AppError::Unauthenticated("missing actor".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Unauthorized("denied".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::SystemRoleProtected("administrator".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::CyclicHierarchy("teller".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::InvalidTemplate("retired".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn generic_errors_map_to_stable_statuses() {
        assert_eq!(
            status_of(AppError::Validation("bad".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("role".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Internal("pool closed".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn body_carries_code_and_hides_internal_detail() {
        let response = ApiError::from(AppError::Internal("connection reset".to_owned()))
            .into_response();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("error body should be readable");
        };
        let Ok(body) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            panic!("error body should be json");
        };

        assert_eq!(body["code"], "internal");
        assert_eq!(body["message"], "internal server error");
    }
}
