//! HTTP client for the host's request/response endpoints.
//!
//! | Method | Path                          | Purpose          | Response                       |
//! |--------|-------------------------------|------------------|--------------------------------|
//! | POST   | `/pair?code={code}`           | pairing          | `{success, deviceId?, error?}` |
//! | GET    | `/clipboard`                  | read clipboard   | `{success, content}`           |
//! | POST   | `/clipboard?content={text}`   | write clipboard  | `{success}`                    |
//! | POST   | `/files/upload` (multipart)   | upload one file  | `{success, error?}`            |
//!
//! [`HostApi`] implements both [`PairingService`] and [`TransferService`], so
//! the application layer never sees `reqwest`.
//!
//! Query values (the pairing code, clipboard text) are percent-encoded by
//! `reqwest`.  Error messages are stripped of the request URL before they
//! leave this module so neither value ends up in a log line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::pair_device::{PairError, PairingService, DEFAULT_PAIR_REJECTION};
use crate::application::session_controller::{host_authority, DEFAULT_HOST_PORT};
use crate::application::transfer_files::{
    TransferError, TransferService, CLIPBOARD_READ_REJECTION, CLIPBOARD_WRITE_REJECTION,
    DEFAULT_UPLOAD_REJECTION,
};

/// Multipart form field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";
/// Content type of the uploaded part.
pub const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

// ── Settings ──────────────────────────────────────────────────────────────────

/// HTTP client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Port used when the host address carries none.
    pub port: u16,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_HOST_PORT,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ── Response bodies ───────────────────────────────────────────────────────────

/// Body of `POST /pair`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairResponse {
    pub success: bool,
    #[serde(rename = "deviceId", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /clipboard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardResponse {
    pub success: bool,
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /clipboard` and `POST /files/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Picks the host's reason when it gave a non-empty one.
fn reason_or(error: Option<String>, default: &str) -> String {
    error
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

// ── Client ────────────────────────────────────────────────────────────────────

/// `reqwest`-backed client for the host HTTP API.
#[derive(Debug, Clone)]
pub struct HostApi {
    client: Client,
    port: u16,
}

impl HostApi {
    /// Builds a client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the underlying client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            port: settings.port,
        })
    }

    /// Returns `http://host:port` for `host`.
    pub fn base_url(&self, host: &str) -> String {
        format!("http://{}", host_authority(host, self.port))
    }

    fn endpoint(&self, host: &str, path: &str) -> String {
        format!("{}{path}", self.base_url(host))
    }
}

/// Describes a transport failure without the request URL.
fn describe(e: reqwest::Error) -> String {
    let timeout = e.is_timeout();
    let e = e.without_url();
    if timeout {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    }
}

/// Checks the status and decodes a JSON body.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        return Err(format!("host answered HTTP {status}"));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| format!("malformed response body: {}", describe(e)))
}

#[async_trait]
impl PairingService for HostApi {
    async fn pair(&self, code: &str, host: &str) -> Result<String, PairError> {
        let response = self
            .client
            .post(self.endpoint(host, "/pair"))
            .query(&[("code", code)])
            .send()
            .await
            .map_err(|e| PairError::Transport(describe(e)))?;

        let body: PairResponse = read_json(response).await.map_err(PairError::Transport)?;
        if !body.success {
            return Err(PairError::Rejected(reason_or(body.error, DEFAULT_PAIR_REJECTION)));
        }
        body.device_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PairError::Transport("pairing response has no deviceId".to_string()))
    }
}

#[async_trait]
impl TransferService for HostApi {
    async fn upload(
        &self,
        payload: Vec<u8>,
        filename: &str,
        host: &str,
    ) -> Result<(), TransferError> {
        let part = Part::bytes(payload)
            .file_name(filename.to_string())
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(|e| TransferError::Transport(describe(e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(self.endpoint(host, "/files/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransferError::Transport(describe(e)))?;

        let body: SuccessResponse = read_json(response)
            .await
            .map_err(TransferError::Transport)?;
        if body.success {
            debug!(filename, "host accepted upload");
            Ok(())
        } else {
            Err(TransferError::Rejected(reason_or(
                body.error,
                DEFAULT_UPLOAD_REJECTION,
            )))
        }
    }

    async fn get_clipboard(&self, host: &str) -> Result<String, TransferError> {
        let response = self
            .client
            .get(self.endpoint(host, "/clipboard"))
            .send()
            .await
            .map_err(|e| TransferError::Transport(describe(e)))?;

        let body: ClipboardResponse = read_json(response)
            .await
            .map_err(TransferError::Transport)?;
        if body.success {
            Ok(body.content)
        } else {
            Err(TransferError::Rejected(CLIPBOARD_READ_REJECTION.to_string()))
        }
    }

    async fn set_clipboard(&self, content: &str, host: &str) -> Result<bool, TransferError> {
        let response = self
            .client
            .post(self.endpoint(host, "/clipboard"))
            .query(&[("content", content)])
            .send()
            .await
            .map_err(|e| TransferError::Transport(describe(e)))?;

        let body: SuccessResponse = read_json(response)
            .await
            .map_err(TransferError::Transport)?;
        if body.success {
            Ok(true)
        } else {
            Err(TransferError::Rejected(reason_or(
                body.error,
                CLIPBOARD_WRITE_REJECTION,
            )))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
