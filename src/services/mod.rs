pub mod backup_env;
pub mod backup_service;
pub mod coordinator;
pub mod dump_format;
pub mod process_runner;
pub mod restore_service;
pub mod scheduler_service;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::error::Result;
    use crate::services::process_runner::{CommandSpec, ProcessOutput, ProcessRunner};

    /// Scripted stand-in for the system runner: records every spec it
    /// receives and answers from a caller-supplied responder.
    pub struct FakeRunner {
        calls: Mutex<Vec<CommandSpec>>,
        responder: Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput> + Send + Sync>,
    }

    impl FakeRunner {
        pub fn scripted<F>(responder: F) -> Self
        where
            F: Fn(&CommandSpec) -> Result<ProcessOutput> + Send + Sync + 'static,
        {
            Self {
                calls: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            }
        }

        pub fn always(output: ProcessOutput) -> Self {
            Self::scripted(move |_| Ok(output.clone()))
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
            self.calls.lock().unwrap().push(spec.clone());
            (self.responder)(spec)
        }
    }

    pub fn ok_output(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            code: 0,
        }
    }

    pub fn test_config(backup_dir: &Path, script: &Path) -> Config {
        Config {
            database_url: "postgresql://postgres:pw@localhost:5432/salon".into(),
            bind_address: "127.0.0.1:0".into(),
            backup_dir: backup_dir.to_string_lossy().into_owned(),
            backup_script_path: script.to_string_lossy().into_owned(),
            backup_env_path: None,
            backup_passphrase: Some("test-passphrase".into()),
            backup_chat_id: None,
            sys_admin_chat_ids: vec![],
            telegram_bot_token: None,
            backup_hour_utc: 3,
            backup_minute_utc: 30,
            restore_max_mb: 200,
            backup_timeout_secs: 60,
            restore_tool_timeout_secs: 60,
            strict_script_exec_check: false,
        }
    }
}
