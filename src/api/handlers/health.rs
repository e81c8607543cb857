//! Health check endpoint.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::SharedState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize, ToSchema)]
pub struct HealthChecks {
    pub database: CheckStatus,
}

#[derive(Serialize, ToSchema)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check endpoint - basic liveness check.
///
/// Reports `maintenance` instead of probing the database while a
/// restore is running: the pool is disposed during the destructive
/// phase and a probe would only produce noise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let db_check = if state.coordinator.is_maintenance() {
        CheckStatus {
            status: "maintenance".to_string(),
            message: Some("restore in progress".to_string()),
        }
    } else {
        match state.db.pool().await {
            Ok(pool) => match sqlx::query("SELECT 1").fetch_one(&pool).await {
                Ok(_) => CheckStatus {
                    status: "healthy".to_string(),
                    message: None,
                },
                Err(e) => CheckStatus {
                    status: "unhealthy".to_string(),
                    message: Some(format!("Database connection failed: {}", e)),
                },
            },
            Err(e) => CheckStatus {
                status: "unhealthy".to_string(),
                message: Some(e.to_string()),
            },
        }
    };

    let status = if db_check.status == "unhealthy" {
        "unhealthy"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database: db_check },
    })
}
