//! External tool invocation behind a narrow, fakeable seam.
//!
//! Every child process the orchestrator starts (backup script, gpg,
//! pg_restore, psql version probes and one-liners) goes through the
//! [`ProcessRunner`] trait so the restore pipeline can be exercised in
//! tests without any PostgreSQL tooling installed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{AppError, Result};

/// Specification of a single child-process invocation.
///
/// `envs` is overlaid on the inherited process environment. Arguments are
/// passed as an argv list, never through a shell, so user-controlled
/// paths cannot be interpolated. Args may carry secrets (gpg passphrase);
/// callers log what is safe, the runner itself only logs the program name.
#[derive(Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: HashMap::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, envs: &HashMap<String, String>) -> Self {
        self.envs.extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Trimmed stdout, falling back to stderr when stdout is empty.
    /// Matches how psql/pg tools report version strings and errors.
    pub fn text(&self) -> String {
        let out = self.stdout.trim();
        if out.is_empty() {
            self.stderr.trim().to_string()
        } else {
            out.to_string()
        }
    }
}

/// A pluggable child-process executor.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion, capturing stdout/stderr/exit code.
    /// A non-zero exit is not an error at this layer; timeouts are.
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput>;
}

/// Runner backed by `tokio::process::Command`.
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %spec.program, timeout_secs = spec.timeout.as_secs(), "spawning child process");

        let output = timeout(spec.timeout, command.output())
            .await
            .map_err(|_| {
                AppError::Internal(format!(
                    "{} timed out after {}s",
                    spec.program,
                    spec.timeout.as_secs()
                ))
            })??;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let spec = CommandSpec::new("sh").args(["-c", "echo hello"]);
        let output = SystemProcessRunner.run(&spec).await.unwrap();
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn reports_nonzero_exit_without_erroring() {
        let spec = CommandSpec::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        let output = SystemProcessRunner.run(&spec).await.unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn enforces_timeout() {
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100));
        let err = SystemProcessRunner.run(&spec).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn text_falls_back_to_stderr() {
        let output = ProcessOutput {
            stdout: "  \n".into(),
            stderr: "psql: error\n".into(),
            code: 1,
        };
        assert_eq!(output.text(), "psql: error");
    }
}
