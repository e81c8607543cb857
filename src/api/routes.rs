//! Route definitions for the API.

use axum::{middleware, routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers;
use super::middleware::maintenance::maintenance_guard;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    let openapi = super::openapi::ApiDoc::openapi();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .nest("/api/v1/admin/backups", handlers::backups::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            maintenance_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
