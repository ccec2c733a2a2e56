mod cors;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use lendgate_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(frontend_url)?;

    let protected_routes = Router::new()
        .route(
            "/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/roles/standard",
            get(handlers::roles::list_standard_roles_handler),
        )
        .route(
            "/roles/from-template",
            post(handlers::roles::create_role_from_template_handler),
        )
        .route(
            "/roles/{role_id}",
            put(handlers::roles::update_role_handler).delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/roles/{role_id}/permissions",
            post(handlers::roles::grant_role_permission_handler),
        )
        .route(
            "/roles/{role_id}/permissions/{permission_id}",
            delete(handlers::roles::revoke_role_permission_handler),
        )
        .route(
            "/permissions",
            get(handlers::roles::list_permissions_handler),
        )
        .route("/matrix", get(handlers::roles::permission_matrix_handler))
        .route(
            "/matrix/toggle",
            put(handlers::roles::toggle_matrix_cell_handler),
        )
        .route(
            "/templates",
            get(handlers::templates::list_templates_handler)
                .post(handlers::templates::create_template_handler),
        )
        .route(
            "/templates/import",
            post(handlers::templates::import_template_handler),
        )
        .route(
            "/templates/{template_id}",
            get(handlers::templates::get_template_handler),
        )
        .route(
            "/templates/{template_id}/export",
            get(handlers::templates::export_template_handler),
        )
        .route(
            "/templates/{template_id}/apply/{target_type}/{target_id}",
            post(handlers::templates::apply_template_handler),
        )
        .route(
            "/users/{user_id}/roles",
            get(handlers::users::list_user_roles_handler)
                .post(handlers::users::assign_user_role_handler),
        )
        .route(
            "/users/{user_id}/roles/{role_id}",
            delete(handlers::users::revoke_user_role_handler),
        )
        .route(
            "/users/{user_id}/permissions",
            post(handlers::users::grant_user_permission_handler)
                .delete(handlers::users::revoke_user_permission_handler),
        )
        .route(
            "/users/{user_id}/effective-permissions",
            get(handlers::users::user_effective_permissions_handler),
        )
        .route(
            "/users/{user_id}/placement",
            put(handlers::users::update_user_placement_handler),
        )
        .route(
            "/users/{user_id}/positions",
            post(handlers::users::assign_user_position_handler),
        )
        .route(
            "/users/{user_id}/positions/{position_id}",
            delete(handlers::users::unassign_user_position_handler),
        )
        .route(
            "/positions",
            get(handlers::positions::list_positions_handler)
                .post(handlers::positions::create_position_handler),
        )
        .route(
            "/positions/{position_id}/permissions",
            put(handlers::positions::set_position_permission_handler),
        )
        .route(
            "/authorize",
            post(handlers::authorization::authorize_handler),
        )
        .route(
            "/applications",
            post(handlers::applications::create_application_handler),
        )
        .route(
            "/applications/{application_id}",
            get(handlers::applications::get_application_handler),
        )
        .route(
            "/applications/{application_id}/transition",
            post(handlers::applications::transition_application_handler),
        )
        .route("/audit", get(handlers::audit::list_audit_log_handler))
        .route(
            "/audit/export",
            get(handlers::audit::export_audit_log_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_gateway_identity,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}
