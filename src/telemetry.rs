//! Telemetry initialization: tracing subscriber with env-filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Honors `RUST_LOG`; defaults keep this crate at debug and request
/// tracing at debug while quieting sqlx query logs.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "backup_keeper=debug,tower_http=debug,sqlx::query=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
