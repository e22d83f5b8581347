//! WebSocket event channel to the host.
//!
//! # How it works (for beginners)
//!
//! After pairing, the device opens `ws://host:port/ws/{device_id}` and keeps
//! it open.  Three background tasks share the socket:
//!
//! ```text
//!   send() ──┐
//!            ├──▶ mpsc queue ──▶ writer task ──▶ socket sink ──▶ host
//!  heartbeat ┘
//!
//!   host ──▶ socket stream ──▶ reader task ──▶ "last event" watch
//! ```
//!
//! - The **writer task** is the only owner of the socket's write half.  Every
//!   outbound frame goes through one unbounded queue, so frames leave in the
//!   order `send()` was called.
//! - The **reader task** decodes text frames into
//!   [`InboundEvent`]s and publishes the newest one.  Binary, ping, and pong
//!   frames are ignored.
//! - The **heartbeat task** queues a `ping` action every interval while the
//!   channel is open.
//!
//! A read error, a failed write, or a Close frame from the host moves the
//! channel to [`ChannelState::Closed`].  Nothing here reconnects; the
//! session controller decides whether to open a new channel.

pub mod heartbeat;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use remote_core::{decode_inbound, encode_action, ActionMessage, ChannelState, InboundEvent};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::application::session_controller::{ActiveChannel, ChannelError, EventChannelConnector};
use heartbeat::heartbeat_loop;

/// How long `close()` waits for the Close frame to be written.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// ── Settings ──────────────────────────────────────────────────────────────────

/// Event channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Time allowed for the TCP connect plus WebSocket upgrade.
    pub open_timeout: Duration,
    /// Keepalive period.
    pub heartbeat_interval: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens [`WsEventChannel`]s with `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    settings: ChannelSettings,
}

impl WsConnector {
    pub fn new(settings: ChannelSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl EventChannelConnector for WsConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn ActiveChannel>, ChannelError> {
        let request = url
            .into_client_request()
            .map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;

        let (ws, response) =
            tokio::time::timeout(self.settings.open_timeout, connect_async(request))
                .await
                .map_err(|_| ChannelError::Timeout(self.settings.open_timeout))?
                .map_err(|e| ChannelError::Handshake(e.to_string()))?;

        info!(url, status = %response.status(), "event channel open");
        Ok(Box::new(WsEventChannel::spawn(
            ws,
            self.settings.heartbeat_interval,
        )))
    }
}

// ── Channel ───────────────────────────────────────────────────────────────────

/// Items on the writer queue.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// A JSON text frame.
    Frame(String),
    /// Send a normal-closure Close frame and stop.
    Close,
}

/// An open WebSocket event channel and its background tasks.
pub struct WsEventChannel {
    outbound: mpsc::UnboundedSender<Outbound>,
    state: Arc<watch::Sender<ChannelState>>,
    events: Arc<watch::Sender<Option<InboundEvent>>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WsEventChannel {
    /// Takes ownership of an upgraded socket and starts the writer, reader,
    /// and heartbeat tasks.  The channel starts `Open`.
    pub fn spawn<S>(ws: WebSocketStream<S>, heartbeat_interval: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let (state, _) = watch::channel(ChannelState::Open);
        let (events, _) = watch::channel(None);
        let state = Arc::new(state);
        let events = Arc::new(events);
        let (outbound, queue) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(sink, queue, Arc::clone(&state)));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&state), Arc::clone(&events)));
        let heartbeat = tokio::spawn(heartbeat_loop(
            outbound.clone(),
            heartbeat_interval,
            state.subscribe(),
        ));

        Self {
            outbound,
            state,
            events,
            heartbeat: Mutex::new(Some(heartbeat)),
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Returns the current lifecycle state.
    pub fn current_state(&self) -> ChannelState {
        *self.state.borrow()
    }
}

fn take(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

#[async_trait]
impl ActiveChannel for WsEventChannel {
    fn send(&self, message: &ActionMessage) {
        if self.current_state() != ChannelState::Open {
            debug!(kind = message.kind(), "event channel not open; dropping action");
            return;
        }
        match encode_action(message) {
            Ok(text) => {
                debug!(kind = message.kind(), "queueing action");
                if self.outbound.send(Outbound::Frame(text)).is_err() {
                    debug!("writer task gone; dropping action");
                }
            }
            Err(e) => error!(kind = message.kind(), "failed to encode action: {e}"),
        }
    }

    fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    fn events(&self) -> watch::Receiver<Option<InboundEvent>> {
        self.events.subscribe()
    }

    async fn close(&self) {
        if let Some(heartbeat) = take(&self.heartbeat) {
            heartbeat.abort();
        }
        self.state.send_replace(ChannelState::Closed);

        if let Some(mut writer) = take(&self.writer) {
            // The writer may already be gone after a host close.
            let _ = self.outbound.send(Outbound::Close);
            if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                warn!("timed out sending close frame");
            }
            writer.abort();
        }
        if let Some(reader) = take(&self.reader) {
            reader.abort();
        }
        debug!("event channel closed");
    }
}

impl Drop for WsEventChannel {
    fn drop(&mut self) {
        for slot in [&self.heartbeat, &self.writer, &self.reader] {
            if let Some(task) = take(slot) {
                task.abort();
            }
        }
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;
type WsStream<S> = SplitStream<WebSocketStream<S>>;

/// Drains the outbound queue into the socket.
///
/// Ends on `Outbound::Close`, on a write failure, or as soon as the channel
/// leaves `Open` for any other reason (host close, read failure).  In every
/// case the socket is closed and the sink released on the way out.
async fn write_loop<S>(
    mut sink: WsSink<S>,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<watch::Sender<ChannelState>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut watch_state = state.subscribe();
    loop {
        tokio::select! {
            biased;
            item = queue.recv() => match item {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        warn!("event channel write failed: {e}");
                        state.send_replace(ChannelState::Closed);
                        break;
                    }
                }
                Some(Outbound::Close) | None => break,
            },
            _ = async {
                let _ = watch_state.wait_for(|s| *s == ChannelState::Closed).await;
            } => break,
        }
    }
    close_sink(&mut sink).await;
}

/// Sends a normal-closure frame (or, after a host close, flushes the queued
/// reply) and shuts the write half down.
async fn close_sink<S>(sink: &mut WsSink<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!("close frame not delivered: {e}");
    }
    if let Err(e) = sink.close().await {
        debug!("event channel shutdown: {e}");
    }
}

/// Publishes host events until the socket fails or the host closes it.
async fn read_loop<S>(
    mut stream: WsStream<S>,
    state: Arc<watch::Sender<ChannelState>>,
    events: Arc<watch::Sender<Option<InboundEvent>>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_inbound(&text) {
                Ok(event) => {
                    debug!(kind = event.kind(), "host event");
                    events.send_replace(Some(event));
                }
                Err(e) => warn!("dropping malformed host frame: {e}"),
            },
            Ok(Message::Close(frame)) => {
                info!(?frame, "host closed the event channel");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("event channel read failed: {e}");
                break;
            }
        }
    }
    state.send_replace(ChannelState::Closed);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use remote_core::protocol::messages::MouseButton;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    /// Returns `(client, server)` WebSockets joined by an in-memory pipe.
    async fn socket_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        tokio::join!(
            WebSocketStream::from_raw_socket(a, Role::Client, None),
            WebSocketStream::from_raw_socket(b, Role::Server, None),
        )
    }

    async fn next_text(server: &mut WebSocketStream<DuplexStream>) -> String {
        loop {
            match server.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_send_writes_json_text_frames_in_order() {
        // Arrange
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));

        // Act
        channel.send(&ActionMessage::mouse_move(3, -1));
        channel.send(&ActionMessage::mouse_click(MouseButton::Left, 1));
        channel.send(&ActionMessage::type_text("hi"));

        // Assert
        assert_eq!(
            next_text(&mut server).await,
            r#"{"type":"mouse_move","data":{"dx":3,"dy":-1}}"#
        );
        assert!(next_text(&mut server).await.contains(r#""type":"mouse_click""#));
        assert!(next_text(&mut server).await.contains(r#""text":"hi""#));
    }

    #[tokio::test]
    async fn test_inbound_text_frame_becomes_last_event() {
        // Arrange
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));
        let mut events = channel.events();

        // Act: a malformed frame first, then a valid one
        server.send(Message::Text("not json".into())).await.unwrap();
        server
            .send(Message::Text(r#"{"type":"volume","data":{"level":40}}"#.into()))
            .await
            .unwrap();

        // Assert
        let event = events.wait_for(|e| e.is_some()).await.unwrap().clone().unwrap();
        assert_eq!(event.kind(), "volume");
        assert_eq!(event.data()["level"], 40);
        assert_eq!(channel.current_state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_host_close_moves_channel_to_closed() {
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));
        let mut state = channel.state();

        server.close(None).await.unwrap();

        state.wait_for(|s| *s == ChannelState::Closed).await.unwrap();
    }

    #[tokio::test]
    async fn test_host_close_releases_socket() {
        // Arrange
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));

        // Act
        server.close(None).await.unwrap();

        // Assert: the close reply is flushed and the client end is dropped
        let drained = tokio::time::timeout(Duration::from_secs(3), async {
            while let Some(Ok(_)) = server.next().await {}
        })
        .await;
        assert!(drained.is_ok(), "client kept the socket open after a host close");
        assert_eq!(channel.current_state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_close_after_host_close_returns_promptly() {
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));
        let mut state = channel.state();
        server.close(None).await.unwrap();
        state.wait_for(|s| *s == ChannelState::Closed).await.unwrap();

        let closed = tokio::time::timeout(Duration::from_secs(1), channel.close()).await;

        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_close_sends_normal_closure_and_drops_later_sends() {
        // Arrange
        let (client, mut server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));

        // Act
        channel.close().await;
        channel.send(&ActionMessage::screenshot());

        // Assert
        assert_eq!(channel.current_state(), ChannelState::Closed);
        match server.next().await {
            Some(Ok(Message::Close(Some(frame)))) => assert_eq!(frame.code, CloseCode::Normal),
            other => panic!("expected a close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, _server) = socket_pair().await;
        let channel = WsEventChannel::spawn(client, Duration::from_secs(3600));

        channel.close().await;
        channel.close().await;

        assert_eq!(channel.current_state(), ChannelState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_channel_sends_heartbeat_ping() {
        let (client, mut server) = socket_pair().await;
        let _channel = WsEventChannel::spawn(client, Duration::from_secs(30));

        assert_eq!(next_text(&mut server).await, r#"{"type":"ping","data":{}}"#);
    }

    #[tokio::test]
    async fn test_connector_reports_handshake_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let connector = WsConnector::new(ChannelSettings::default());

        let result = connector.open(&format!("ws://127.0.0.1:{port}/ws/dev-9")).await;

        assert!(matches!(result, Err(ChannelError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_connector_rejects_invalid_url() {
        let connector = WsConnector::default();

        let result = connector.open("not a url").await;

        assert!(matches!(result, Err(ChannelError::InvalidUrl(_))));
    }
}
