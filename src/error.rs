//! Application error types and result alias.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another backup or restore operation is already in flight.
    /// Retryable by the caller; never escalated to an operator alert.
    #[error("backup or restore operation already in progress")]
    Busy,

    /// The backup runtime (shell interpreter, backup script) failed
    /// pre-flight validation. Raised before any destructive action.
    #[error("Backup runtime validation failed: {0}")]
    RuntimeValidation(String),

    /// Client/server PostgreSQL major versions disagree or could not be
    /// determined. Raised strictly before the schema reset.
    #[error("PostgreSQL version mismatch: {0}")]
    VersionMismatch(String),

    /// GPG decryption failed (wrong passphrase or corrupt ciphertext).
    #[error("Restore failed during decrypt: {0}")]
    Decrypt(String),

    /// The restore tool exited with an unrecognized fatal condition.
    /// Occurs after the schema reset: the database is left empty or
    /// partially restored and operators must be told.
    #[error("Restore failed: {0}")]
    RestoreExecution(String),

    /// The restore tool reported success but a required table is missing.
    #[error("Restore verification failed: {0}")]
    Verification(String),

    /// Transport adapter error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address parse error
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database operation failed".to_string(),
            ),
            AppError::Busy => (
                StatusCode::CONFLICT,
                "BUSY",
                "backup or restore operation already in progress".to_string(),
            ),
            AppError::RuntimeValidation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RUNTIME_VALIDATION",
                msg.clone(),
            ),
            AppError::VersionMismatch(msg) => {
                (StatusCode::CONFLICT, "VERSION_MISMATCH", msg.clone())
            }
            AppError::Decrypt(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DECRYPT_ERROR",
                msg.clone(),
            ),
            AppError::RestoreExecution(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RESTORE_EXECUTION",
                msg.clone(),
            ),
            AppError::Verification(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RESTORE_VERIFICATION",
                msg.clone(),
            ),
            AppError::Transport(msg) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                "IO operation failed".to_string(),
            ),
            AppError::AddrParse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ADDR_PARSE_ERROR",
                "Invalid address".to_string(),
            ),
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "JSON_ERROR",
                "Invalid JSON".to_string(),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        // Log the error
        tracing::error!(error = %self, code = code, "Request error");

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
