//! Daily backup scheduler.
//!
//! One detached task: run a catch-up backup at startup when the latest
//! backup is older than 24 hours, then fire at the configured UTC time
//! every day. Failures are logged and reported to the sys-admin chats;
//! the loop itself never exits.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;

use crate::error::AppError;
use crate::services::backup_service::BackupService;
use crate::services::transport::Transport;

pub struct SchedulerService {
    backup: Arc<BackupService>,
    transport: Option<Arc<dyn Transport>>,
    sys_admin_chat_ids: Vec<i64>,
    hour_utc: u32,
    minute_utc: u32,
}

impl SchedulerService {
    pub fn new(
        backup: Arc<BackupService>,
        transport: Option<Arc<dyn Transport>>,
        sys_admin_chat_ids: Vec<i64>,
        hour_utc: u32,
        minute_utc: u32,
    ) -> Self {
        Self {
            backup,
            transport,
            sys_admin_chat_ids,
            hour_utc,
            minute_utc,
        }
    }

    /// Spawn the scheduler loop as a detached task.
    pub fn spawn(self) {
        tokio::spawn(async move {
            self.run().await;
        });
    }

    async fn run(self) {
        tracing::info!(
            hour = self.hour_utc,
            minute = self.minute_utc,
            "backup scheduler started"
        );

        if self.backup.is_catchup_required() {
            tracing::info!("no backup in the last 24h, running catch-up backup");
            self.run_cycle().await;
        }

        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.hour_utc, self.minute_utc);
            let sleep_for = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tracing::debug!(next = %next, "scheduler sleeping until next backup window");
            tokio::time::sleep(sleep_for).await;
            self.run_cycle().await;
        }
    }

    /// One scheduled cycle: backup, then ship the result off-host. A
    /// concurrent operator-initiated run makes this cycle a no-op.
    async fn run_cycle(&self) {
        match self.backup.run_backup().await {
            Ok(metadata) => {
                tracing::info!(file = %metadata.filename, size = metadata.size_bytes, "scheduled backup completed");
                if let Err(e) = self.backup.send_latest().await {
                    match e {
                        AppError::Config(_) => {
                            tracing::debug!(error = %e, "backup delivery not configured, keeping local copy only")
                        }
                        _ => {
                            tracing::error!(error = %e, "failed to deliver scheduled backup");
                            self.notify_admins(&format!("Backup delivery failed: {e}")).await;
                        }
                    }
                }
            }
            Err(AppError::Busy) => {
                tracing::info!("another backup or restore is running, skipping scheduled backup");
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduled backup failed");
                self.notify_admins(&format!("Scheduled backup failed: {e}")).await;
            }
        }
    }

    async fn notify_admins(&self, text: &str) {
        let Some(transport) = &self.transport else {
            return;
        };
        for chat_id in &self.sys_admin_chat_ids {
            if let Err(e) = transport.send_message(*chat_id, text).await {
                tracing::warn!(chat_id, error = %e, "failed to notify sys admin");
            }
        }
    }
}

/// Next occurrence of `hour:minute` UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
        .single()
        .unwrap_or(now);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}
