use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use lendgate_domain::{ImportMode, PortableTemplate, TemplateTarget};

use crate::dto::{
    CreateTemplateRequest, ImportTemplateQuery, PortableTemplateDto, TemplateApplicationResponse,
    TemplateImportResponse, TemplateResponse,
};

use super::*;

pub async fn list_templates_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<TemplateResponse>>> {
    let templates = state
        .security_admin_service
        .list_templates(&actor)
        .await?
        .into_iter()
        .map(TemplateResponse::from)
        .collect();

    Ok(Json(templates))
}

pub async fn get_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(template_id): Path<String>,
) -> ApiResult<Json<TemplateResponse>> {
    let template = state
        .security_admin_service
        .get_template(&actor, parse_path::<TemplateId>(&template_id)?)
        .await?;

    Ok(Json(TemplateResponse::from(template)))
}

pub async fn create_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<TemplateResponse>)> {
    let template = state
        .security_admin_service
        .create_template(&actor, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(TemplateResponse::from(template))))
}

pub async fn export_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(template_id): Path<String>,
) -> ApiResult<Response> {
    let portable = state
        .security_admin_service
        .export_template(&actor, parse_path::<TemplateId>(&template_id)?)
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}.json\"",
        export_file_stem(&portable.name)
    ))
    .map_err(|error| AppError::Internal(format!("invalid export file name: {error}")))?;

    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(PortableTemplateDto::from(portable)),
    )
        .into_response())
}

pub async fn import_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<ImportTemplateQuery>,
    Json(payload): Json<PortableTemplateDto>,
) -> ApiResult<(StatusCode, Json<TemplateImportResponse>)> {
    let mode = match query.mode.as_deref() {
        Some(mode) => mode.parse::<ImportMode>()?,
        None => ImportMode::CreateNew,
    };

    let result = state
        .security_admin_service
        .import_template(&actor, PortableTemplate::try_from(payload)?, mode)
        .await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(TemplateImportResponse::from(result))))
}

pub async fn apply_template_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((template_id, target_type, target_id)): Path<(String, String, String)>,
) -> ApiResult<Json<TemplateApplicationResponse>> {
    let application = state
        .security_admin_service
        .apply_template(
            &actor,
            parse_path::<TemplateId>(&template_id)?,
            TemplateTarget::from_transport(&target_type, &target_id)?,
        )
        .await?;

    Ok(Json(TemplateApplicationResponse::from(application)))
}

fn export_file_stem(name: &str) -> String {
    name.chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '_' | '-') {
                character
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::export_file_stem;

    #[test]
    fn export_file_stem_keeps_headers_safe() {
        assert_eq!(export_file_stem("credit_officer"), "credit_officer");
        assert_eq!(export_file_stem("a\"b; c"), "a_b__c");
    }
}
