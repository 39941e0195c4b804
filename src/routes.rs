// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessment},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Every route requires a bearer token; admin routes also require the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let assessment_routes = Router::new()
        .route("/", get(assessment::list_assessments))
        .route("/{id}", get(assessment::get_assessment))
        .route("/{id}/status", get(assessment::get_status))
        .route("/{id}/attempts", post(assessment::start_attempt))
        .route("/{id}/submit", post(assessment::submit_assessment))
        .route("/{id}/results", get(assessment::list_results));

    let admin_routes = Router::new()
        .route("/categories", post(admin::create_category))
        .route("/assessments", post(admin::create_assessment))
        .route(
            "/assessments/{id}",
            put(admin::update_assessment).delete(admin::delete_assessment),
        )
        .route(
            "/assessments/{id}/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/assessments/{id}/attempts/{user_id}/abandon",
            post(admin::abandon_attempt),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        // Auth runs first (outermost), then the admin check
        .layer(middleware::from_fn(admin_middleware));

    let api = Router::new()
        .route("/categories", get(assessment::list_categories))
        .route("/me/category-scores", get(assessment::list_category_scores))
        .nest("/assessments", assessment_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
