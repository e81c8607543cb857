//! Backup Keeper - Main Entry Point

use std::sync::Arc;

use backup_keeper::{
    api::{routes::create_router, AppState},
    config::Config,
    db::Db,
    error::Result,
    services::{
        backup_service::BackupService,
        coordinator::OperationCoordinator,
        process_runner::SystemProcessRunner,
        restore_service::RestoreService,
        scheduler_service::SchedulerService,
        transport::{TelegramTransport, Transport},
    },
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Starting Backup Keeper");
    tracing::debug!(config = ?config, "loaded configuration");

    let db = Db::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    let coordinator = Arc::new(OperationCoordinator::new(
        std::path::Path::new(&config.backup_dir).join(".backup.lock"),
    ));

    let transport: Option<Arc<dyn Transport>> = match &config.telegram_bot_token {
        Some(token) => Some(Arc::new(TelegramTransport::new(Some(token.clone()))?)),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, backup delivery and uploads are disabled");
            None
        }
    };

    let runner = Arc::new(SystemProcessRunner);
    let backup = Arc::new(BackupService::new(
        config.clone(),
        coordinator.clone(),
        runner.clone(),
        transport.clone(),
    )?);
    let restore = Arc::new(RestoreService::new(
        config.clone(),
        Some(db.clone()),
        coordinator.clone(),
        runner,
        transport.clone(),
        backup.clone(),
    ));

    SchedulerService::new(
        backup.clone(),
        transport,
        config.sys_admin_chat_ids.clone(),
        config.backup_hour_utc,
        config.backup_minute_utc,
    )
    .spawn();

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        coordinator,
        backup,
        restore,
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Listening on {}", config.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
