//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Directory holding backup files, the metadata descriptor, the
    /// operation lock file, and the restore audit log
    pub backup_dir: String,

    /// Path to the external backup shell script
    pub backup_script_path: String,

    /// Optional env file overlaid on the process environment before
    /// running backup/restore tools (KEY=value lines)
    pub backup_env_path: Option<String>,

    /// Passphrase for GPG-encrypted backups (supplied out of band)
    pub backup_passphrase: Option<String>,

    /// Chat id that receives uploaded backup files
    pub backup_chat_id: Option<i64>,

    /// Chat ids notified about scheduler failures
    pub sys_admin_chat_ids: Vec<i64>,

    /// Telegram bot token for the transport adapter
    pub telegram_bot_token: Option<String>,

    /// Daily backup time of day, UTC
    pub backup_hour_utc: u32,
    pub backup_minute_utc: u32,

    /// Maximum accepted size for an uploaded restore file, in megabytes
    pub restore_max_mb: u64,

    /// Timeout for the backup script, seconds
    pub backup_timeout_secs: u64,

    /// Timeout for pg_restore / psql runs during restore, seconds
    pub restore_tool_timeout_secs: u64,

    /// When true, the backup script must also carry the executable bit
    pub strict_script_exec_check: bool,
}

redacted_debug!(Config {
    show: [
        bind_address,
        backup_dir,
        backup_script_path,
        backup_env_path,
        backup_chat_id,
        sys_admin_chat_ids,
        backup_hour_utc,
        backup_minute_utc,
        restore_max_mb,
        backup_timeout_secs,
        restore_tool_timeout_secs,
        strict_script_exec_check,
    ],
    mask: [database_url],
    mask_opt: [backup_passphrase, telegram_bot_token],
});

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let (backup_hour_utc, backup_minute_utc) =
            parse_time_of_day(&env::var("BACKUP_TIME_UTC").unwrap_or_else(|_| "03:30".into()))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            backup_dir: env::var("BACKUP_DIR")
                .unwrap_or_else(|_| "/var/lib/backup-keeper/backups".into()),
            backup_script_path: env::var("BACKUP_SCRIPT_PATH")
                .unwrap_or_else(|_| "/opt/backup-keeper/backup.sh".into()),
            backup_env_path: env::var("BACKUP_ENV_PATH").ok(),
            backup_passphrase: env::var("BACKUP_PASSPHRASE").ok(),
            backup_chat_id: env::var("BACKUP_CHAT_ID").ok().and_then(|v| v.parse().ok()),
            sys_admin_chat_ids: env::var("SYS_ADMIN_CHAT_IDS")
                .map(|v| parse_chat_ids(&v))
                .unwrap_or_default(),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            backup_hour_utc,
            backup_minute_utc,
            restore_max_mb: env::var("RESTORE_MAX_MB")
                .unwrap_or_else(|_| "200".into())
                .parse()
                .unwrap_or(200),
            backup_timeout_secs: env::var("BACKUP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "1800".into())
                .parse()
                .unwrap_or(1800),
            restore_tool_timeout_secs: env::var("RESTORE_TOOL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "1800".into())
                .parse()
                .unwrap_or(1800),
            strict_script_exec_check: env::var("STRICT_SCRIPT_EXEC_CHECK")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

/// Parse an `HH:MM` time-of-day string.
fn parse_time_of_day(value: &str) -> Result<(u32, u32)> {
    let mut parts = value.splitn(2, ':');
    let hour: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| AppError::Config(format!("invalid BACKUP_TIME_UTC: {value}")))?;
    let minute: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| AppError::Config(format!("invalid BACKUP_TIME_UTC: {value}")))?;
    if hour > 23 || minute > 59 {
        return Err(AppError::Config(format!(
            "invalid BACKUP_TIME_UTC: {value}"
        )));
    }
    Ok((hour, minute))
}

/// Parse a comma-separated list of numeric chat ids, skipping junk tokens.
fn parse_chat_ids(value: &str) -> Vec<i64> {
    value
        .split(',')
        .filter_map(|token| token.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_of_day() {
        assert_eq!(parse_time_of_day("03:30").unwrap(), (3, 30));
        assert_eq!(parse_time_of_day("23:59").unwrap(), (23, 59));
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("garbage").is_err());
    }

    #[test]
    fn parses_chat_id_list_skipping_junk() {
        assert_eq!(
            parse_chat_ids(" 123, -456, nope, 789 "),
            vec![123, -456, 789]
        );
        assert!(parse_chat_ids("").is_empty());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = Config {
            database_url: "postgresql://user:hunter2@db:5432/app".into(),
            bind_address: "0.0.0.0:8080".into(),
            backup_dir: "/backups".into(),
            backup_script_path: "/opt/backup.sh".into(),
            backup_env_path: None,
            backup_passphrase: Some("topsecret".into()),
            backup_chat_id: None,
            sys_admin_chat_ids: vec![],
            telegram_bot_token: Some("12345:token".into()),
            backup_hour_utc: 3,
            backup_minute_utc: 30,
            restore_max_mb: 200,
            backup_timeout_secs: 1800,
            restore_tool_timeout_secs: 1800,
            strict_script_exec_check: false,
        };
        let output = format!("{:?}", config);
        assert!(!output.contains("hunter2"));
        assert!(!output.contains("topsecret"));
        assert!(!output.contains("12345:token"));
    }
}
