//! Maintenance-mode middleware that shields the database during a restore.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::SharedState;

/// Middleware that rejects requests while a restore holds the
/// maintenance flag.
///
/// During the destructive phase the connection pool is disposed and the
/// `public` schema may not exist, so any handler touching the database
/// would fail in confusing ways. Health checks stay reachable so
/// orchestrators do not kill the process mid-restore, and the backup
/// admin endpoints stay reachable so the operator keeps visibility
/// (concurrent operations are refused by the single-flight lock, not
/// by this gate).
pub async fn maintenance_guard(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.coordinator.is_maintenance() {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if path == "/health" || path.starts_with("/api/v1/admin/backups") {
        return next.run(request).await;
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "code": "MAINTENANCE",
            "message": "Service is temporarily unavailable: a database restore is in progress."
        })),
    )
        .into_response()
}
