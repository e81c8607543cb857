//! Telegram transport adapter.
//!
//! The orchestrator needs exactly three capabilities from the messaging
//! platform: send a text message, send a document, and fetch a
//! previously uploaded document by reference. Everything else about the
//! bot (menus, webhooks, access control) lives in the outer layer.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Errors raised at the transport boundary.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("TELEGRAM_BOT_TOKEN is not configured")]
    MissingToken,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::Transport(err.to_string())
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Reference to a document held by the messaging platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    /// Server-side path used to download the content
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Messaging capabilities required by the orchestrator.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<()>;

    async fn send_document(
        &self,
        chat_id: i64,
        file_path: &Path,
        caption: &str,
    ) -> TransportResult<()>;

    async fn get_file(&self, file_id: &str) -> TransportResult<RemoteFile>;

    /// Download a previously fetched `RemoteFile::file_path` to `dest`,
    /// returning the byte count written.
    async fn download_file(&self, remote_path: &str, dest: &Path) -> TransportResult<u64>;
}

/// Bot API response envelope. Responses are deserialized into typed
/// structs at this boundary; no loose JSON maps cross into the services.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self, method: &str) -> TransportResult<T> {
        if !self.ok {
            return Err(TransportError::Api(format!(
                "{method}: {}",
                self.description.unwrap_or_else(|| "unknown error".into())
            )));
        }
        self.result
            .ok_or_else(|| TransportError::Api(format!("{method}: empty result")))
    }
}

#[derive(Debug, Deserialize)]
struct Ignored {}

/// Telegram Bot API implementation.
pub struct TelegramTransport {
    http: Client,
    token: String,
}

impl TelegramTransport {
    pub fn new(token: Option<String>) -> TransportResult<Self> {
        let token = token.ok_or(TransportError::MissingToken)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { http, token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    fn file_url(&self, remote_path: &str) -> String {
        format!("https://api.telegram.org/file/bot{}/{}", self.token, remote_path)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<()> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;
        let envelope: ApiEnvelope<Ignored> = response.json().await?;
        envelope.into_result("sendMessage").map(|_| ())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_path: &Path,
        caption: &str,
    ) -> TransportResult<()> {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup.bin".to_string());
        let content = tokio::fs::read(file_path).await?;

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(content).file_name(file_name));

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let envelope: ApiEnvelope<Ignored> = response.json().await?;
        envelope.into_result("sendDocument").map(|_| ())
    }

    async fn get_file(&self, file_id: &str) -> TransportResult<RemoteFile> {
        let response = self
            .http
            .post(self.method_url("getFile"))
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await?;
        let envelope: ApiEnvelope<RemoteFile> = response.json().await?;
        envelope.into_result("getFile")
    }

    async fn download_file(&self, remote_path: &str, dest: &Path) -> TransportResult<u64> {
        let mut response = self
            .http
            .get(self.file_url(remote_path))
            .send()
            .await?
            .error_for_status()?;

        // Dumps can run to hundreds of megabytes; copy to disk chunk by
        // chunk instead of holding the whole body in memory.
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_surfaces_api_description() {
        let envelope: ApiEnvelope<Ignored> =
            serde_json::from_str(r#"{"ok": false, "description": "chat not found"}"#).unwrap();
        let err = envelope.into_result("sendMessage").unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[test]
    fn envelope_parses_remote_file() {
        let envelope: ApiEnvelope<RemoteFile> = serde_json::from_str(
            r#"{"ok": true, "result": {"file_id": "abc", "file_path": "documents/file_7.gpg", "file_size": 1024}}"#,
        )
        .unwrap();
        let file = envelope.into_result("getFile").unwrap();
        assert_eq!(file.file_path.as_deref(), Some("documents/file_7.gpg"));
        assert_eq!(file.file_size, Some(1024));
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(matches!(
            TelegramTransport::new(None),
            Err(TransportError::MissingToken)
        ));
    }

    #[test]
    fn envelope_tolerates_missing_result_field() {
        let envelope: ApiEnvelope<RemoteFile> =
            serde_json::from_str(r#"{"ok": true}"#).unwrap();
        let err = envelope.into_result("getFile").unwrap_err();
        assert!(err.to_string().contains("empty result"));

        let envelope: ApiEnvelope<Ignored> =
            serde_json::from_str(r#"{"ok": true, "result": {}}"#).unwrap();
        assert!(envelope.into_result("sendMessage").is_ok());
    }
}
