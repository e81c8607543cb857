//! Backup and restore admin endpoints.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::backup_service::BackupMetadata;
use crate::services::restore_service::RestoreResult;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/latest", get(latest_backup))
        .route("/run", post(run_backup))
        .route("/send", post(send_backup))
        .route("/restore/latest", post(restore_latest))
        .route("/restore/upload", post(restore_upload))
}

/// Identity of the operator driving the request, for the audit log.
/// Upstream auth (reverse proxy / bot gateway) sets the header; absent
/// or malformed values are recorded as actor 0.
fn actor_id(headers: &HeaderMap) -> i64 {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[derive(Deserialize, ToSchema)]
pub struct RestoreUploadRequest {
    /// Transport-side file identifier of the uploaded backup.
    pub file_id: String,
    /// Original filename, used (sanitized) for the staged copy.
    pub file_name: String,
}

/// Metadata of the most recent backup
#[utoipa::path(
    get,
    path = "/latest",
    context_path = "/api/v1/admin/backups",
    tag = "backups",
    responses(
        (status = 200, description = "Latest backup metadata", body = BackupMetadata),
        (status = 404, description = "No backups exist yet")
    )
)]
pub async fn latest_backup(State(state): State<SharedState>) -> Result<Json<BackupMetadata>> {
    let metadata = state
        .backup
        .latest_metadata()?
        .ok_or_else(|| AppError::NotFound("no backups found".into()))?;
    Ok(Json(metadata))
}

/// Run a backup now
#[utoipa::path(
    post,
    path = "/run",
    context_path = "/api/v1/admin/backups",
    tag = "backups",
    responses(
        (status = 200, description = "Backup finished", body = BackupMetadata),
        (status = 409, description = "Another backup or restore is running"),
        (status = 500, description = "Backup failed")
    )
)]
pub async fn run_backup(State(state): State<SharedState>) -> Result<Json<BackupMetadata>> {
    let metadata = state.backup.run_backup().await?;
    Ok(Json(metadata))
}

/// Send the latest backup to the configured backup chat
#[utoipa::path(
    post,
    path = "/send",
    context_path = "/api/v1/admin/backups",
    tag = "backups",
    responses(
        (status = 200, description = "Backup sent", body = BackupMetadata),
        (status = 404, description = "No backups exist yet"),
        (status = 502, description = "Delivery failed")
    )
)]
pub async fn send_backup(State(state): State<SharedState>) -> Result<Json<BackupMetadata>> {
    let metadata = state.backup.send_latest().await?;
    Ok(Json(metadata))
}

/// Restore the most recent local backup
#[utoipa::path(
    post,
    path = "/restore/latest",
    context_path = "/api/v1/admin/backups",
    tag = "backups",
    responses(
        (status = 200, description = "Restore finished", body = RestoreResult),
        (status = 404, description = "No backups exist yet"),
        (status = 409, description = "Another backup or restore is running"),
        (status = 500, description = "Restore failed")
    )
)]
pub async fn restore_latest(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<RestoreResult>> {
    let result = state.restore.restore_latest_local(actor_id(&headers)).await?;
    Ok(Json(result))
}

/// Restore from an uploaded backup file
#[utoipa::path(
    post,
    path = "/restore/upload",
    context_path = "/api/v1/admin/backups",
    tag = "backups",
    request_body = RestoreUploadRequest,
    responses(
        (status = 200, description = "Restore finished", body = RestoreResult),
        (status = 400, description = "Upload rejected (size limit or bad metadata)"),
        (status = 409, description = "Another backup or restore is running"),
        (status = 500, description = "Restore failed")
    )
)]
pub async fn restore_upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<RestoreUploadRequest>,
) -> Result<Json<RestoreResult>> {
    if body.file_id.trim().is_empty() {
        return Err(AppError::Validation("file_id must not be empty".into()));
    }
    let result = state
        .restore
        .restore_from_upload(&body.file_id, &body.file_name, actor_id(&headers))
        .await?;
    Ok(Json(result))
}
