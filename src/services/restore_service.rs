//! Destructive restore pipeline.
//!
//! A restore replaces the entire `public` schema of the live database
//! with the contents of a backup file. The pipeline stages the input
//! through decrypt/decompress in a scratch directory, guards against
//! newer-client dumps, then performs the destructive phase (session
//! termination, schema reset, tool execution, verification) with the
//! maintenance flag raised and the connection pool disposed.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

use crate::config::Config;
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::services::backup_env::{load_overlay_env, DbTarget};
use crate::services::backup_service::BackupService;
use crate::services::coordinator::OperationCoordinator;
use crate::services::dump_format::{detect_format, filter_incompatible_settings, DumpFormat};
use crate::services::process_runner::{CommandSpec, ProcessOutput, ProcessRunner};
use crate::services::transport::Transport;

/// Tables that must exist after a successful restore. An empty or
/// foreign dump that "restores" cleanly but misses these is rejected.
const REQUIRED_TABLES: [&str; 5] = ["alembic_version", "admins", "masters", "services", "bookings"];

const RESET_SCHEMA_SQL: &str = "DROP SCHEMA IF EXISTS public CASCADE;\
CREATE SCHEMA public;\
GRANT ALL ON SCHEMA public TO postgres;\
GRANT ALL ON SCHEMA public TO public;";

const TERMINATE_SESSIONS_SQL: &str = "SELECT pg_terminate_backend(pid) \
FROM pg_stat_activity \
WHERE datname = current_database() AND pid <> pg_backend_pid()";

/// Stderr noise pg_restore emits for settings the target server does not
/// know. Tolerated only when the closing summary confirms these were the
/// sole failures.
const BENIGN_PATTERN_PARAMETER: &str = "unrecognized configuration parameter";
const BENIGN_PATTERN_SUMMARY: &str = "errors ignored on restore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStatus {
    Ok,
    OkWithWarnings,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RestoreResult {
    /// Always true when a result is produced; fatal outcomes raise
    /// a typed error instead.
    pub ok: bool,
    pub status: RestoreStatus,
    pub file: String,
    pub file_type: String,
    pub duration_seconds: f64,
    pub removed_incompatible_sets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_summary: Option<String>,
}

/// Outcome of the staged + destructive phases, before timing/audit wrap.
struct PipelineOutcome {
    format: DumpFormat,
    removed_sets: usize,
    warning_summary: Option<String>,
}

/// Runtime resolved at pipeline start: the env-file overlay applied on
/// top of the static configuration, the same layering the backup runner
/// uses. An overlay `DATABASE_URL` retargets the restore; an overlay
/// `BACKUP_PASSPHRASE` supplies the decryption key; the merged
/// environment reaches every restore tool.
struct RestoreContext {
    target: DbTarget,
    passphrase: Option<String>,
    env: HashMap<String, String>,
}

pub struct RestoreService {
    config: Arc<Config>,
    db: Option<Db>,
    coordinator: Arc<OperationCoordinator>,
    runner: Arc<dyn ProcessRunner>,
    transport: Option<Arc<dyn Transport>>,
    backup: Arc<BackupService>,
}

impl RestoreService {
    pub fn new(
        config: Arc<Config>,
        db: Option<Db>,
        coordinator: Arc<OperationCoordinator>,
        runner: Arc<dyn ProcessRunner>,
        transport: Option<Arc<dyn Transport>>,
        backup: Arc<BackupService>,
    ) -> Self {
        Self {
            config,
            db,
            coordinator,
            runner,
            transport,
            backup,
        }
    }

    /// Restore the most recent backup known to the metadata store.
    pub async fn restore_latest_local(&self, actor_id: i64) -> Result<RestoreResult> {
        let metadata = self
            .backup
            .latest_metadata()?
            .ok_or_else(|| AppError::NotFound("no backups found".into()))?;
        let source = format!("local:{}", metadata.filename);
        self.restore_from_path(Path::new(&metadata.path), actor_id, &source)
            .await
    }

    /// Download an operator-uploaded file through the transport into the
    /// restore scratch directory, then restore it.
    pub async fn restore_from_upload(
        &self,
        file_id: &str,
        file_name: &str,
        actor_id: i64,
    ) -> Result<RestoreResult> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| AppError::Config("TELEGRAM_BOT_TOKEN is not configured".into()))?;

        let remote = transport.get_file(file_id).await?;
        let max_bytes = self.config.restore_max_mb * 1024 * 1024;
        if let Some(size) = remote.file_size {
            if size > max_bytes {
                return Err(AppError::Validation(format!(
                    "uploaded file is {size} bytes, limit is {} MB",
                    self.config.restore_max_mb
                )));
            }
        }
        let remote_path = remote
            .file_path
            .ok_or_else(|| AppError::Transport("file metadata without a path".into()))?;

        let local_name = format!(
            "{}_{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            sanitize_filename(file_name)
        );
        let dest = self.backup.restore_dir().join(local_name);
        let written = transport.download_file(&remote_path, &dest).await?;
        if written > max_bytes {
            let _ = std::fs::remove_file(&dest);
            return Err(AppError::Validation(format!(
                "uploaded file is {written} bytes, limit is {} MB",
                self.config.restore_max_mb
            )));
        }
        tracing::info!(file = %dest.display(), bytes = written, "uploaded restore file staged");

        let source = format!("telegram:{}", sanitize_filename(file_name));
        self.restore_from_path(&dest, actor_id, &source).await
    }

    /// Run the full restore pipeline for a file on disk, under the
    /// single-flight lock, writing an audit log line for the outcome.
    pub async fn restore_from_path(
        &self,
        input: &Path,
        actor_id: i64,
        source: &str,
    ) -> Result<RestoreResult> {
        let _guard = self.coordinator.begin("restore")?;
        let started = Instant::now();
        tracing::info!(file = %input.display(), actor_id, source, "restore started");

        match self.run_pipeline(input).await {
            Ok(outcome) => {
                let duration = started.elapsed().as_secs_f64();
                let status = if outcome.warning_summary.is_some() {
                    RestoreStatus::OkWithWarnings
                } else {
                    RestoreStatus::Ok
                };
                let detail = format!(
                    "type={} removed_sets={} duration={duration:.1}s",
                    outcome.format.as_str(),
                    outcome.removed_sets
                );
                if let Err(e) = self.backup.append_restore_log(
                    actor_id,
                    source,
                    if status == RestoreStatus::Ok {
                        "ok"
                    } else {
                        "ok_with_warnings"
                    },
                    Some(&detail),
                ) {
                    tracing::warn!(error = %e, "failed to write restore audit log");
                }
                tracing::info!(file = %input.display(), duration, "restore finished");
                Ok(RestoreResult {
                    ok: true,
                    status,
                    file: input
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    file_type: outcome.format.as_str().to_string(),
                    duration_seconds: duration,
                    removed_incompatible_sets: outcome.removed_sets,
                    warning_summary: outcome.warning_summary,
                })
            }
            Err(e) => {
                if let Err(log_err) =
                    self.backup
                        .append_restore_log(actor_id, source, "error", Some(&e.to_string()))
                {
                    tracing::warn!(error = %log_err, "failed to write restore audit log");
                }
                tracing::error!(file = %input.display(), error = %e, "restore failed");
                self.notify_failure(source, &e).await;
                Err(e)
            }
        }
    }

    /// Failures in the post-reset risk window leave the database empty
    /// or partially restored; operators must hear about those, not just
    /// the request that triggered them.
    async fn notify_failure(&self, source: &str, error: &AppError) {
        if !matches!(
            error,
            AppError::RestoreExecution(_) | AppError::Verification(_)
        ) {
            return;
        }
        let Some(transport) = &self.transport else {
            return;
        };
        let text = format!(
            "Restore of {source} failed after the schema reset; the database may be empty or partially restored: {error}"
        );
        for chat_id in &self.config.sys_admin_chat_ids {
            if let Err(e) = transport.send_message(*chat_id, &text).await {
                tracing::warn!(chat_id, error = %e, "failed to notify sys admin about restore failure");
            }
        }
    }

    async fn run_pipeline(&self, input: &Path) -> Result<PipelineOutcome> {
        if !input.is_file() {
            return Err(AppError::NotFound(format!(
                "restore input not found: {}",
                input.display()
            )));
        }

        let ctx = self.resolve_context()?;
        let scratch = tempfile::tempdir()?;
        let staged = self.stage_input(input, scratch.path(), &ctx).await?;
        let format = detect_format(&staged)?;
        tracing::info!(format = format.as_str(), "dump format detected");

        self.ensure_version_compatibility(&ctx).await?;

        // Destructive phase. The maintenance flag stays up and the pool
        // stays disposed until verification completes or fails.
        let maintenance = self.coordinator.enter_maintenance();
        if let Some(db) = &self.db {
            db.dispose().await;
        }
        let result = self
            .destructive_phase(&staged, format, &ctx, scratch.path())
            .await;
        if let Some(db) = &self.db {
            if let Err(e) = db.reconnect().await {
                tracing::error!(error = %e, "failed to reconnect pool after restore");
            }
        }
        drop(maintenance);

        let (removed_sets, warning_summary) = result?;
        Ok(PipelineOutcome {
            format,
            removed_sets,
            warning_summary,
        })
    }

    /// Resolve the env-file overlay against the static configuration.
    fn resolve_context(&self) -> Result<RestoreContext> {
        let mut env = load_overlay_env(self.config.backup_env_path.as_deref())?;
        let database_url = env
            .get("DATABASE_URL")
            .cloned()
            .unwrap_or_else(|| self.config.database_url.clone());
        let target = DbTarget::from_url(&database_url)?;
        let passphrase = env
            .get("BACKUP_PASSPHRASE")
            .cloned()
            .or_else(|| self.config.backup_passphrase.clone());
        // An explicit PGPASSWORD in the env file wins over the URL.
        env.entry("PGPASSWORD".into())
            .or_insert_with(|| target.password.clone());
        Ok(RestoreContext {
            target,
            passphrase,
            env,
        })
    }

    /// Decrypt and decompress the input into the scratch directory as
    /// needed, returning the path of the raw dump. Wrapping is decided
    /// by extension, so the inner filename is preserved at each step
    /// (`x.sql.gz.gpg` decrypts to `x.sql.gz`, then gunzips to `x.sql`).
    async fn stage_input(
        &self,
        input: &Path,
        scratch: &Path,
        ctx: &RestoreContext,
    ) -> Result<PathBuf> {
        let mut current = input.to_path_buf();

        if has_extension(&current, "gpg") {
            let decrypted = scratch.join(inner_name(&current, "decrypted.dump"));
            self.decrypt_backup(&current, &decrypted, ctx).await?;
            current = decrypted;
        }

        if has_extension(&current, "gz") {
            let decompressed = scratch.join(inner_name(&current, "decompressed.dump"));
            gunzip_file(&current, &decompressed)?;
            current = decompressed;
        }

        Ok(current)
    }

    async fn decrypt_backup(&self, input: &Path, output: &Path, ctx: &RestoreContext) -> Result<()> {
        let passphrase = ctx
            .passphrase
            .as_deref()
            .ok_or_else(|| AppError::Config("BACKUP_PASSPHRASE is not configured".into()))?;

        // The passphrase travels in argv; the runner logs only the
        // program name, never arguments.
        let spec = CommandSpec::new("gpg")
            .args(["--batch", "--yes", "--decrypt"])
            .args(["--pinentry-mode", "loopback"])
            .arg("--passphrase")
            .arg(passphrase)
            .arg("-o")
            .arg(output.to_string_lossy())
            .arg(input.to_string_lossy())
            .envs(&ctx.env)
            .timeout(Duration::from_secs(self.config.restore_tool_timeout_secs));
        let result = self.runner.run(&spec).await?;
        if !result.success() {
            return Err(AppError::Decrypt(error_tail(&result.stderr)));
        }
        Ok(())
    }

    /// Cross-version restores silently corrupt session-parameter
    /// handling, so the guard is strict: the pg_restore client, the
    /// pg_dump client, and the live server must all report the same
    /// major version, and all three must be determinable. Runs before
    /// the schema reset, so a mismatch never costs data.
    async fn ensure_version_compatibility(&self, ctx: &RestoreContext) -> Result<()> {
        let restore_major = self.tool_major("pg_restore", ctx).await;
        let dump_major = self.tool_major("pg_dump", ctx).await;
        let server_major = self.server_major(ctx).await;

        match (restore_major, dump_major, server_major) {
            (Some(r), Some(d), Some(s)) if r == d && d == s => {
                tracing::info!(major = r, "pg version check passed");
                Ok(())
            }
            _ => Err(AppError::VersionMismatch(format!(
                "pg_restore {}, pg_dump {}, server {}",
                describe_major(restore_major),
                describe_major(dump_major),
                describe_major(server_major),
            ))),
        }
    }

    async fn tool_major(&self, tool: &str, ctx: &RestoreContext) -> Option<u32> {
        self.runner
            .run(
                &CommandSpec::new(tool)
                    .arg("--version")
                    .envs(&ctx.env)
                    .timeout(Duration::from_secs(15)),
            )
            .await
            .ok()
            .filter(|o| o.success())
            .and_then(|o| extract_client_major(&o.text()))
    }

    async fn server_major(&self, ctx: &RestoreContext) -> Option<u32> {
        if let Ok(output) = self.psql(ctx, "SHOW server_version_num").await {
            if output.success() {
                if let Some(major) = extract_server_major_num(&output.text()) {
                    return Some(major);
                }
            }
        }
        self.psql(ctx, "SHOW server_version")
            .await
            .ok()
            .filter(|o| o.success())
            .and_then(|o| extract_server_major(&o.text()))
    }

    async fn destructive_phase(
        &self,
        staged: &Path,
        format: DumpFormat,
        ctx: &RestoreContext,
        scratch: &Path,
    ) -> Result<(usize, Option<String>)> {
        // Lingering sessions can hold locks that block the schema drop.
        // Termination failing is not fatal; the reset will surface it.
        match self.psql(ctx, TERMINATE_SESSIONS_SQL).await {
            Ok(output) if !output.success() => {
                tracing::warn!(stderr = %output.stderr.trim(), "session termination reported errors")
            }
            Err(e) => tracing::warn!(error = %e, "session termination failed"),
            Ok(_) => {}
        }

        let reset = self.psql_strict(ctx, RESET_SCHEMA_SQL).await?;
        if !reset.success() {
            return Err(AppError::RestoreExecution(format!(
                "schema reset failed: {}",
                error_tail(&reset.stderr)
            )));
        }

        let (execution, removed_sets) = match format {
            DumpFormat::Custom => (self.run_pg_restore(staged, ctx).await?, 0),
            DumpFormat::PlainSql => {
                let filtered = scratch.join("filtered.sql");
                let removed = filter_incompatible_settings(staged, &filtered)?;
                if removed > 0 {
                    tracing::info!(removed, "dropped incompatible SET statements from plain dump");
                }
                (self.run_psql_file(&filtered, ctx).await?, removed)
            }
        };
        let warning_summary = classify_execution(&execution)?;

        let health = self.psql(ctx, "SELECT 1").await?;
        if health.text() != "1" {
            return Err(AppError::Verification(format!(
                "post-restore health check failed: {}",
                error_tail(&health.text())
            )));
        }

        self.verify_required_tables(ctx).await?;
        Ok((removed_sets, warning_summary))
    }

    async fn run_pg_restore(&self, dump: &Path, ctx: &RestoreContext) -> Result<ProcessOutput> {
        let spec = CommandSpec::new("pg_restore")
            .args(["--exit-on-error", "--no-owner", "--no-privileges"])
            .args(ctx.target.connection_args())
            .arg(dump.to_string_lossy())
            .envs(&ctx.env)
            .timeout(Duration::from_secs(self.config.restore_tool_timeout_secs));
        self.runner.run(&spec).await
    }

    async fn run_psql_file(&self, sql_file: &Path, ctx: &RestoreContext) -> Result<ProcessOutput> {
        let spec = CommandSpec::new("psql")
            .args(ctx.target.connection_args())
            .args(["-v", "ON_ERROR_STOP=1"])
            .arg("-f")
            .arg(sql_file.to_string_lossy())
            .envs(&ctx.env)
            .timeout(Duration::from_secs(self.config.restore_tool_timeout_secs));
        self.runner.run(&spec).await
    }

    /// One-shot psql statement with tuples-only output.
    async fn psql(&self, ctx: &RestoreContext, sql: &str) -> Result<ProcessOutput> {
        let spec = CommandSpec::new("psql")
            .args(ctx.target.connection_args())
            .arg("-Atqc")
            .arg(sql)
            .envs(&ctx.env)
            .timeout(Duration::from_secs(60));
        self.runner.run(&spec).await
    }

    /// Same, but abort on the first SQL error.
    async fn psql_strict(&self, ctx: &RestoreContext, sql: &str) -> Result<ProcessOutput> {
        let spec = CommandSpec::new("psql")
            .args(ctx.target.connection_args())
            .args(["-v", "ON_ERROR_STOP=1"])
            .arg("-Atqc")
            .arg(sql)
            .envs(&ctx.env)
            .timeout(Duration::from_secs(120));
        self.runner.run(&spec).await
    }

    async fn verify_required_tables(&self, ctx: &RestoreContext) -> Result<()> {
        let mut missing = Vec::new();
        for table in REQUIRED_TABLES {
            let sql = format!("SELECT to_regclass('public.{table}')");
            let output = self.psql(ctx, &sql).await?;
            if !output.success() || output.text().is_empty() {
                missing.push(table);
            }
        }
        if !missing.is_empty() {
            return Err(AppError::Verification(format!(
                "restored database is missing required tables: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Decide whether tool output counts as success. A non-zero exit is
/// tolerated only when the stderr shows the unrecognized-parameter noise
/// AND the closing "errors ignored on restore" summary; anything else is
/// fatal. Returns the warning summary for the tolerated case.
fn classify_execution(execution: &ProcessOutput) -> Result<Option<String>> {
    if execution.success() {
        // A clean exit can still carry warnings on stderr; those must
        // surface in the result rather than vanish.
        return Ok(summarize_warnings(&execution.stderr));
    }
    let stderr_lower = execution.stderr.to_lowercase();
    if stderr_lower.contains(BENIGN_PATTERN_PARAMETER)
        && stderr_lower.contains(BENIGN_PATTERN_SUMMARY)
    {
        tracing::warn!(rc = execution.code, "restore tool exited non-zero with only benign setting errors");
        return Ok(Some(
            summarize_warnings(&execution.stderr)
                .unwrap_or_else(|| "restore completed with ignored errors".to_string()),
        ));
    }
    Err(AppError::RestoreExecution(error_tail(&execution.stderr)))
}

/// First couple of warning-looking stderr lines, joined for the caller.
/// `None` when stderr carries no warnings.
fn summarize_warnings(stderr: &str) -> Option<String> {
    let picked: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| {
            let lower = l.to_lowercase();
            lower.contains("warning")
                || lower.contains(BENIGN_PATTERN_PARAMETER)
                || lower.contains(BENIGN_PATTERN_SUMMARY)
        })
        .take(2)
        .collect();
    if picked.is_empty() {
        None
    } else {
        Some(picked.join("; "))
    }
}

/// Compact tail of tool output for error messages: whitespace collapsed,
/// last ~300 chars, prefixed with an ellipsis when truncated.
pub fn error_tail(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= 300 {
        collapsed
    } else {
        let tail: String = chars[chars.len() - 300..].iter().collect();
        format!("…{tail}")
    }
}

fn describe_major(major: Option<u32>) -> String {
    match major {
        Some(v) => format!("v{v}"),
        None => "undetermined".to_string(),
    }
}

/// Major version out of `pg_restore (PostgreSQL) 16.2` style output.
fn extract_client_major(version_line: &str) -> Option<u32> {
    version_line
        .split_whitespace()
        .last()?
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// Major version out of `server_version_num` output, e.g. `160004`.
fn extract_server_major_num(value: &str) -> Option<u32> {
    let num: u32 = value.trim().parse().ok()?;
    if num < 100_000 {
        return None;
    }
    Some(num / 10_000)
}

/// Major version out of `16.2 (Debian ...)` or plain `16.2`.
fn extract_server_major(version: &str) -> Option<u32> {
    version
        .split_whitespace()
        .next()?
        .split('.')
        .next()?
        .parse()
        .ok()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Filename with its outermost extension stripped (`x.sql.gz` → `x.sql`).
fn inner_name(path: &Path, fallback: &str) -> PathBuf {
    path.file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(fallback))
}

fn gunzip_file(input: &Path, output: &Path) -> Result<()> {
    let reader = std::fs::File::open(input)?;
    let mut decoder = flate2::read::GzDecoder::new(std::io::BufReader::new(reader));
    let mut writer = std::io::BufWriter::new(std::fs::File::create(output)?);
    std::io::copy(&mut decoder, &mut writer)?;
    Ok(())
}

/// Keep uploaded filenames shell- and path-safe.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload.bin".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            code,
        }
    }

    #[test]
    fn clean_exit_classifies_ok() {
        assert!(classify_execution(&output(0, "done", "")).unwrap().is_none());
    }

    #[test]
    fn clean_exit_with_warnings_keeps_the_summary() {
        let stderr = "psql: warning: unrecognized configuration parameter \"io_timeout\"\n";
        let summary = classify_execution(&output(0, "done", stderr)).unwrap().unwrap();
        assert!(summary.contains("unrecognized configuration parameter"));
    }

    #[test]
    fn benign_setting_noise_yields_warnings() {
        let stderr = "pg_restore: warning: unrecognized configuration parameter \"idle_session_timeout\"\n\
                      pg_restore: warning: errors ignored on restore: 2\n";
        let summary = classify_execution(&output(1, "", stderr)).unwrap().unwrap();
        assert!(summary.contains("unrecognized configuration parameter"));
    }

    #[test]
    fn one_pattern_alone_is_fatal() {
        let only_param = "error: unrecognized configuration parameter \"foo\"";
        assert!(matches!(
            classify_execution(&output(1, "", only_param)),
            Err(AppError::RestoreExecution(_))
        ));

        let only_summary = "pg_restore: errors ignored on restore: 5";
        assert!(matches!(
            classify_execution(&output(1, "", only_summary)),
            Err(AppError::RestoreExecution(_))
        ));
    }

    #[test]
    fn real_failure_is_fatal() {
        let stderr = "pg_restore: error: could not execute query: ERROR: relation \"x\" already exists";
        let err = classify_execution(&output(1, "", stderr)).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn error_tail_collapses_and_truncates() {
        assert_eq!(error_tail("a\n  b\t c"), "a b c");

        let long = "x ".repeat(400);
        let tail = error_tail(&long);
        assert!(tail.starts_with('…'));
        assert_eq!(tail.chars().count(), 301);
    }

    #[test]
    fn version_extraction() {
        assert_eq!(extract_client_major("pg_restore (PostgreSQL) 16.2"), Some(16));
        assert_eq!(extract_server_major("15.4 (Debian 15.4-1.pgdg120+1)"), Some(15));
        assert_eq!(extract_server_major("16.1"), Some(16));
        assert_eq!(extract_client_major("garbage"), None);
        assert_eq!(extract_server_major_num("160004"), Some(16));
        assert_eq!(extract_server_major_num("90624"), None);
        assert_eq!(extract_server_major_num("weird"), None);
    }

    #[test]
    fn filename_sanitization() {
        assert_eq!(sanitize_filename("db backup (1).dump.gpg"), "db_backup__1_.dump.gpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..."), "upload.bin");
    }

    #[test]
    fn warning_summary_picks_relevant_lines() {
        let stderr = "reading schemas\n\
                      pg_restore: warning: unrecognized configuration parameter \"a\"\n\
                      pg_restore: warning: unrecognized configuration parameter \"b\"\n\
                      pg_restore: warning: unrecognized configuration parameter \"c\"\n";
        let summary = summarize_warnings(stderr).unwrap();
        assert_eq!(summary.matches("unrecognized").count(), 2);
        assert!(summarize_warnings("reading schemas\n").is_none());
    }
}
