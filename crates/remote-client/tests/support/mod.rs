//! In-process fake host for integration tests.
//!
//! Serves the same HTTP and WebSocket endpoints as a real desktop host on an
//! ephemeral localhost port and records everything the device sends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use remote_client::application::session_controller::{SessionController, SessionSettings};
use remote_client::infrastructure::host_api::{HostApi, HttpSettings};
use remote_client::infrastructure::network::{ChannelSettings, WsConnector};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// The only code the fake host accepts.
pub const VALID_CODE: &str = "123456";
/// Device id issued for [`VALID_CODE`].
pub const DEVICE_ID: &str = "dev-1";

/// What the host has seen so far.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub pair_codes: Vec<String>,
    pub ws_paths: Vec<String>,
    pub frames: Vec<String>,
    pub closes: usize,
    pub uploads: Vec<(String, Option<String>, Vec<u8>)>,
    pub clipboard: String,
}

#[derive(Debug, Clone)]
enum Push {
    Event(String),
    Close,
}

#[derive(Clone)]
struct HostState {
    recorded: Arc<Mutex<Recorded>>,
    push: broadcast::Sender<Push>,
}

/// Handle to a running fake host.
pub struct FakeHost {
    /// `127.0.0.1:PORT`, usable directly as the pairing host.
    pub authority: String,
    state: HostState,
}

impl FakeHost {
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(16);
        let state = HostState {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            push,
        };
        let app = Router::new()
            .route("/pair", post(pair))
            .route("/clipboard", get(get_clipboard).post(set_clipboard))
            .route("/files/upload", post(upload))
            .route("/ws/{device_id}", get(ws_upgrade))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let authority = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { authority, state }
    }

    pub fn recorded(&self) -> Recorded {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn set_clipboard(&self, content: &str) {
        self.state.recorded.lock().unwrap().clipboard = content.to_string();
    }

    /// Sends a text frame to every connected device.
    pub fn push_event(&self, frame: &str) {
        let _ = self.state.push.send(Push::Event(frame.to_string()));
    }

    /// Closes every connected device's socket from the host side.
    pub fn close_connections(&self) {
        let _ = self.state.push.send(Push::Close);
    }

    /// Polls the recording until `check` holds, failing after five seconds.
    pub async fn wait_until(&self, what: &str, check: impl Fn(&Recorded) -> bool) -> Recorded {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let recorded = self.recorded();
            if check(&recorded) {
                return recorded;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}: {recorded:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// A controller wired to the real `reqwest` and `tokio-tungstenite` adapters.
pub fn real_controller() -> Arc<SessionController> {
    let api = Arc::new(HostApi::new(HttpSettings::default()).unwrap());
    Arc::new(SessionController::new(
        api.clone(),
        api,
        Arc::new(WsConnector::new(ChannelSettings::default())),
        SessionSettings::default(),
    ))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn pair(
    State(state): State<HostState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let code = params.get("code").cloned().unwrap_or_default();
    state.recorded.lock().unwrap().pair_codes.push(code.clone());
    if code == VALID_CODE {
        Json(json!({"success": true, "deviceId": DEVICE_ID}))
    } else {
        Json(json!({"success": false, "error": "Invalid code"}))
    }
}

async fn get_clipboard(State(state): State<HostState>) -> impl IntoResponse {
    let content = state.recorded.lock().unwrap().clipboard.clone();
    Json(json!({"success": true, "content": content}))
}

async fn set_clipboard(
    State(state): State<HostState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let content = params.get("content").cloned().unwrap_or_default();
    state.recorded.lock().unwrap().clipboard = content;
    Json(json!({"success": true}))
}

async fn upload(State(state): State<HostState>, mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default().to_vec();
        state
            .recorded
            .lock()
            .unwrap()
            .uploads
            .push((name, file_name, bytes));
    }
    Json(json!({"success": true}))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(device_id): Path<String>,
    State(state): State<HostState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_device(socket, device_id, state))
}

async fn serve_device(socket: WebSocket, device_id: String, state: HostState) {
    let mut push = state.push.subscribe();
    state.recorded.lock().unwrap().ws_paths.push(format!("/ws/{device_id}"));
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    state.recorded.lock().unwrap().frames.push(text.to_string());
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            pushed = push.recv() => match pushed {
                Ok(Push::Event(frame)) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close) | Err(_) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
    state.recorded.lock().unwrap().closes += 1;
}
