//! Command bridge between a UI layer and the session controller.
//!
//! A UI (a native shell, a webview, or the CLI in `main.rs`) should not have
//! to know about `watch` channels, `SessionError`, or `ActionMessage`
//! builders.  This module exposes the controller as a set of async command
//! functions that take and return plain serializable values.
//!
//! # DTOs (Data Transfer Objects)
//!
//! [`SessionStatusDto`] and [`TransferStatusDto`] are flat snapshots of the
//! domain state with enum values rendered as strings, ready to be sent as
//! JSON.
//!
//! # `CommandResult<T>`
//!
//! Every command returns the same envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//! so a caller handles errors the same way for every command.

use std::sync::Arc;

use remote_core::{ActionMessage, Session, TransferStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::session_controller::SessionController;

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Session snapshot for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusDto {
    /// `"Unpaired"`, `"Pairing"`, or `"Paired"`.
    pub pairing_state: String,
    /// `"Idle"`, `"Connecting"`, `"Connected"`, or `"Disconnected"`.
    pub connection_state: String,
    /// Human-readable status such as `"Not Connected"`.
    pub status_label: String,
    pub host: Option<String>,
    pub device_id: Option<String>,
    pub last_error: Option<String>,
}

impl From<&Session> for SessionStatusDto {
    fn from(session: &Session) -> Self {
        Self {
            pairing_state: format!("{:?}", session.pairing_state()),
            connection_state: format!("{:?}", session.connection_state()),
            status_label: session.status_label().to_string(),
            host: session.host().map(str::to_string),
            device_id: session.device_id().map(str::to_string),
            last_error: session.last_error().map(str::to_string),
        }
    }
}

/// Upload status for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStatusDto {
    pub is_uploading: bool,
    pub in_flight: usize,
    pub upload_progress: f64,
    pub last_uploaded_file: Option<String>,
    pub error: Option<String>,
}

impl From<&TransferStatus> for TransferStatusDto {
    fn from(status: &TransferStatus) -> Self {
        Self {
            is_uploading: status.is_uploading(),
            in_flight: status.in_flight,
            upload_progress: status.upload_progress,
            last_uploaded_file: status.last_uploaded_file.clone(),
            error: status.error.clone(),
        }
    }
}

/// An action as a UI sends it: `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl From<ActionDto> for ActionMessage {
    fn from(dto: ActionDto) -> Self {
        ActionMessage::new(dto.kind, dto.data)
    }
}

/// Unified result envelope for every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    /// `true` if the command completed successfully; `false` on error.
    pub success: bool,
    /// The command's return value, present only when `success` is `true`.
    pub data: Option<T>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for CommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current session snapshot.
pub async fn get_session_status(
    controller: Arc<SessionController>,
) -> CommandResult<SessionStatusDto> {
    CommandResult::ok(SessionStatusDto::from(&controller.snapshot()))
}

/// Returns the current upload status.
pub async fn get_transfer_status(
    controller: Arc<SessionController>,
) -> CommandResult<TransferStatusDto> {
    let status = controller.transfers().borrow().clone();
    CommandResult::ok(TransferStatusDto::from(&status))
}

/// Pairs with `host` using `code` and returns the resulting status.
pub async fn pair_device(
    controller: Arc<SessionController>,
    code: String,
    host: String,
) -> CommandResult<SessionStatusDto> {
    if host.trim().is_empty() {
        return CommandResult::err("host must not be empty");
    }
    match controller.pair(&code, &host).await {
        Ok(_) => CommandResult::ok(SessionStatusDto::from(&controller.snapshot())),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Sends one action.  Succeeds even when the channel is down, in which case
/// the action is dropped.
pub async fn send_action(
    controller: Arc<SessionController>,
    action: ActionDto,
) -> CommandResult<()> {
    if action.kind.trim().is_empty() {
        return CommandResult::err("action type must not be empty");
    }
    controller.send(action.into());
    CommandResult::ok(())
}

/// Uploads `payload` to the paired host as `filename`.
pub async fn upload_file(
    controller: Arc<SessionController>,
    filename: String,
    payload: Vec<u8>,
) -> CommandResult<()> {
    if filename.trim().is_empty() {
        return CommandResult::err("filename must not be empty");
    }
    controller.upload(payload, &filename).await.into()
}

/// Reads the paired host's clipboard.
pub async fn read_clipboard(controller: Arc<SessionController>) -> CommandResult<String> {
    controller.get_clipboard().await.into()
}

/// Writes the paired host's clipboard.
pub async fn write_clipboard(
    controller: Arc<SessionController>,
    content: String,
) -> CommandResult<bool> {
    controller.set_clipboard(&content).await.into()
}

/// Closes the event channel, keeping the pairing.
pub async fn disconnect_session(
    controller: Arc<SessionController>,
) -> CommandResult<SessionStatusDto> {
    controller.disconnect().await;
    CommandResult::ok(SessionStatusDto::from(&controller.snapshot()))
}

/// Forgets the paired host.
pub async fn unpair_device(controller: Arc<SessionController>) -> CommandResult<SessionStatusDto> {
    controller.unpair().await;
    CommandResult::ok(SessionStatusDto::from(&controller.snapshot()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
