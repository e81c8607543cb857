//! API module - HTTP handlers and middleware.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Db;
use crate::services::backup_service::BackupService;
use crate::services::coordinator::OperationCoordinator;
use crate::services::restore_service::RestoreService;

/// Application state shared across handlers
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Db,
    pub coordinator: Arc<OperationCoordinator>,
    pub backup: Arc<BackupService>,
    pub restore: Arc<RestoreService>,
}

pub type SharedState = Arc<AppState>;
