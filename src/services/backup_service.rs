//! Backup runner, metadata store, and restore audit log.
//!
//! Backups themselves are produced by an external shell script (which
//! also owns retention/pruning); this service validates the runtime,
//! prepares the environment, runs the script under the single-flight
//! lock, and maintains the `last_backup.json` descriptor the scheduler
//! and status queries read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::backup_env::{load_overlay_env, DbTarget};
use crate::services::coordinator::OperationCoordinator;
use crate::services::process_runner::{CommandSpec, ProcessRunner};
use crate::services::transport::Transport;

/// Filename suffix of finished encrypted backups in the backup directory.
const BACKUP_FILE_SUFFIX: &str = ".dump.gpg";

/// Descriptor of the most recent successful backup (last-write-wins).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackupMetadata {
    pub filename: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

pub struct BackupService {
    config: Arc<Config>,
    coordinator: Arc<OperationCoordinator>,
    runner: Arc<dyn ProcessRunner>,
    transport: Option<Arc<dyn Transport>>,
}

impl BackupService {
    pub fn new(
        config: Arc<Config>,
        coordinator: Arc<OperationCoordinator>,
        runner: Arc<dyn ProcessRunner>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self> {
        let service = Self {
            config,
            coordinator,
            runner,
            transport,
        };
        std::fs::create_dir_all(service.backup_dir())?;
        std::fs::create_dir_all(service.restore_dir())?;
        Ok(service)
    }

    pub fn backup_dir(&self) -> &Path {
        Path::new(&self.config.backup_dir)
    }

    /// Scratch directory for operator-uploaded restore files.
    pub fn restore_dir(&self) -> PathBuf {
        self.backup_dir().join("restores")
    }

    fn metadata_path(&self) -> PathBuf {
        self.backup_dir().join("last_backup.json")
    }

    fn restore_log_path(&self) -> PathBuf {
        self.backup_dir().join("restore.log")
    }

    /// Run the backup script under the single-flight lock and return the
    /// freshly written metadata descriptor.
    pub async fn run_backup(&self) -> Result<BackupMetadata> {
        let _guard = self.coordinator.begin("backup")?;
        self.run_backup_locked().await
    }

    async fn run_backup_locked(&self) -> Result<BackupMetadata> {
        let (script_path, bash_path) = self.validate_runtime().await?;

        let mut env = load_overlay_env(self.config.backup_env_path.as_deref())?;
        let database_url = env
            .get("DATABASE_URL")
            .cloned()
            .unwrap_or_else(|| self.config.database_url.clone());
        let target = DbTarget::from_url(&database_url)?;
        // An explicit PGPASSWORD in the env file wins over the URL.
        env.entry("PGPASSWORD".into())
            .or_insert_with(|| target.password.clone());

        self.log_pg_runtime_versions(&env, &target).await;

        let spec = CommandSpec::new(bash_path.to_string_lossy())
            .arg(script_path.to_string_lossy())
            .envs(&env)
            .timeout(Duration::from_secs(self.config.backup_timeout_secs));
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(AppError::Internal(format!(
                "Backup script failed: {}",
                output.stderr.trim()
            )));
        }
        tracing::info!(output = %output.stdout.trim(), "backup script succeeded");

        self.latest_metadata()?
            .ok_or_else(|| AppError::Internal("backup finished but no metadata was written".into()))
    }

    /// Pre-flight validation of the backup runtime. Collects every
    /// problem before failing so operators see the full picture.
    async fn validate_runtime(&self) -> Result<(PathBuf, PathBuf)> {
        let script_path = PathBuf::from(&self.config.backup_script_path);
        let bash_path = which::which("bash").ok();

        let mut problems: Vec<String> = Vec::new();
        if bash_path.is_none() {
            problems.push("bash is required to run the backup script".into());
        }
        match std::fs::metadata(&script_path) {
            Err(_) => problems.push(format!("backup script not found: {}", script_path.display())),
            Ok(meta) if !meta.is_file() => problems.push(format!(
                "backup script path is not a file: {}",
                script_path.display()
            )),
            Ok(meta) => {
                #[cfg(unix)]
                if self.config.strict_script_exec_check {
                    use std::os::unix::fs::PermissionsExt;
                    if meta.permissions().mode() & 0o111 == 0 {
                        problems.push(format!(
                            "backup script is not executable: {}",
                            script_path.display()
                        ));
                    }
                }
                #[cfg(not(unix))]
                let _ = meta;
            }
        }

        if !problems.is_empty() {
            let message = problems.join("; ");
            tracing::error!(%message, "backup runtime validation failed");
            return Err(AppError::RuntimeValidation(message));
        }

        let bash_path = bash_path.ok_or_else(|| {
            AppError::RuntimeValidation("bash is required to run the backup script".into())
        })?;
        self.check_bash_pipefail(&bash_path).await?;
        self.log_script_diagnostics(&script_path)?;
        Ok((script_path, bash_path))
    }

    /// The backup script relies on `set -o pipefail`; fail fast on a
    /// shell that does not support it.
    async fn check_bash_pipefail(&self, bash_path: &Path) -> Result<()> {
        let spec = CommandSpec::new(bash_path.to_string_lossy())
            .args(["-lc", "set -o pipefail"])
            .timeout(Duration::from_secs(15));
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            let stderr = output.stderr.trim();
            return Err(AppError::RuntimeValidation(format!(
                "bash self-check failed for pipefail: {}",
                if stderr.is_empty() {
                    "unknown error"
                } else {
                    stderr
                }
            )));
        }
        Ok(())
    }

    /// Log the first lines of the script and warn on CRLF endings; CRLF
    /// in the script has repeatedly broken backups inside containers.
    fn log_script_diagnostics(&self, script_path: &Path) -> Result<()> {
        let bytes = std::fs::read(script_path)?;
        if bytes.windows(2).any(|w| w == b"\r\n") {
            tracing::warn!(script = %script_path.display(), "backup script has CRLF line endings");
        }
        let text = String::from_utf8_lossy(&bytes);
        let head: Vec<&str> = text.lines().take(2).collect();
        tracing::info!(script = %script_path.display(), head = ?head, "backup script head");
        Ok(())
    }

    /// Log pg_dump/pg_restore client versions and the live server
    /// version before running the tools, to aid postmortem diagnosis.
    async fn log_pg_runtime_versions(&self, env: &HashMap<String, String>, target: &DbTarget) {
        for tool in ["pg_dump", "pg_restore"] {
            let spec = CommandSpec::new(tool)
                .arg("--version")
                .envs(env)
                .timeout(Duration::from_secs(15));
            match self.runner.run(&spec).await {
                Ok(output) => {
                    tracing::info!(tool, rc = output.code, version = %output.text(), "pg tool version")
                }
                Err(e) => tracing::warn!(tool, error = %e, "pg tool version probe failed"),
            }
        }

        let spec = CommandSpec::new("psql")
            .args(target.connection_args())
            .args(["-Atqc", "SELECT version()"])
            .envs(env)
            .timeout(Duration::from_secs(30));
        match self.runner.run(&spec).await {
            Ok(output) => {
                tracing::info!(rc = output.code, version = %output.text(), "database server version")
            }
            Err(e) => tracing::warn!(error = %e, "server version probe failed"),
        }
    }

    /// Read the persisted descriptor, falling back to a directory scan
    /// for the newest backup file when the descriptor is missing or
    /// corrupt. `None` when the backup directory holds nothing.
    pub fn latest_metadata(&self) -> Result<Option<BackupMetadata>> {
        let metadata_path = self.metadata_path();
        if metadata_path.exists() {
            match std::fs::read_to_string(&metadata_path)
                .map_err(AppError::from)
                .and_then(|text| {
                    serde_json::from_str::<BackupMetadata>(&text).map_err(AppError::from)
                }) {
                Ok(metadata) => return Ok(Some(metadata)),
                Err(e) => {
                    tracing::warn!(path = %metadata_path.display(), error = %e, "invalid backup metadata descriptor, falling back to directory scan");
                }
            }
        }
        self.scan_latest_backup_file()
    }

    fn scan_latest_backup_file(&self) -> Result<Option<BackupMetadata>> {
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        let entries = match std::fs::read_dir(self.backup_dir()) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_backup = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(BACKUP_FILE_SUFFIX))
                .unwrap_or(false);
            if !is_backup || !path.is_file() {
                continue;
            }
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                    newest = Some((modified, path));
                }
            }
        }

        let Some((modified, path)) = newest else {
            return Ok(None);
        };
        let size_bytes = std::fs::metadata(&path)?.len();
        Ok(Some(BackupMetadata {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_string_lossy().into_owned(),
            created_at: DateTime::<Utc>::from(modified),
            size_bytes,
        }))
    }

    /// True when no backup newer than 24 hours exists, meaning the
    /// scheduler should run a catch-up backup immediately at startup.
    pub fn is_catchup_required(&self) -> bool {
        match self.latest_metadata() {
            Ok(Some(metadata)) => Utc::now() - metadata.created_at > chrono::Duration::hours(24),
            _ => true,
        }
    }

    /// Upload the latest backup file to the configured backup chat.
    pub async fn send_latest(&self) -> Result<BackupMetadata> {
        let chat_id = self
            .config
            .backup_chat_id
            .ok_or_else(|| AppError::Config("BACKUP_CHAT_ID is not configured".into()))?;
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| AppError::Config("TELEGRAM_BOT_TOKEN is not configured".into()))?;

        let metadata = self
            .latest_metadata()?
            .ok_or_else(|| AppError::NotFound("no backups found".into()))?;
        let backup_path = PathBuf::from(&metadata.path);
        if !backup_path.exists() {
            return Err(AppError::NotFound(format!(
                "backup file not found: {}",
                metadata.path
            )));
        }

        transport
            .send_document(
                chat_id,
                &backup_path,
                &format!("DB backup: {}", metadata.filename),
            )
            .await?;
        Ok(metadata)
    }

    /// Append a terminal restore outcome to the audit log. One line per
    /// outcome: timestamp, actor, source, status, optional detail.
    pub fn append_restore_log(
        &self,
        actor_id: i64,
        source: &str,
        status: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.restore_log_path())?;
        let suffix = detail.map(|d| format!(" detail={d}")).unwrap_or_default();
        writeln!(
            file,
            "{} actor={actor_id} source={source} status={status}{suffix}",
            Utc::now().to_rfc3339()
        )?;
        Ok(())
    }
}
