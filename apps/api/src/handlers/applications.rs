use lendgate_domain::ApplicationId;

use crate::dto::{CreateApplicationRequest, LoanApplicationResponse, TransitionRequest};

use super::*;

pub async fn create_application_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateApplicationRequest>,
) -> ApiResult<(StatusCode, Json<LoanApplicationResponse>)> {
    let application = state
        .loan_workflow_service
        .create_application(&actor, payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanApplicationResponse::from(application)),
    ))
}

pub async fn get_application_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<LoanApplicationResponse>> {
    let application = state
        .loan_workflow_service
        .get_application(&actor, parse_path::<ApplicationId>(&application_id)?)
        .await?;

    Ok(Json(LoanApplicationResponse::from(application)))
}

pub async fn transition_application_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(application_id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> ApiResult<Json<LoanApplicationResponse>> {
    let (to_state, transition_payload) = payload.into_parts()?;
    let application = state
        .loan_workflow_service
        .transition(
            &actor,
            parse_path::<ApplicationId>(&application_id)?,
            to_state,
            transition_payload,
        )
        .await?;

    Ok(Json(LoanApplicationResponse::from(application)))
}
