//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::services::backup_service::BackupMetadata;
use crate::services::restore_service::{RestoreResult, RestoreStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Backup Keeper API",
        description = "PostgreSQL backup, restore, and maintenance orchestrator.",
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    paths(
        handlers::health::health_check,
        handlers::backups::latest_backup,
        handlers::backups::run_backup,
        handlers::backups::send_backup,
        handlers::backups::restore_latest,
        handlers::backups::restore_upload,
    ),
    tags(
        (name = "health", description = "Health and readiness checks"),
        (name = "backups", description = "Backup and restore administration"),
    ),
    components(schemas(
        BackupMetadata,
        RestoreResult,
        RestoreStatus,
        handlers::backups::RestoreUploadRequest,
        handlers::health::HealthResponse,
        handlers::health::HealthChecks,
        handlers::health::CheckStatus,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "BUSY", "NOT_FOUND")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}
