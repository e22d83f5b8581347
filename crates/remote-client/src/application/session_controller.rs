//! SessionController: the single owner of the device's remote session.
//!
//! # Responsibilities (for beginners)
//!
//! The controller glues the three transport pieces together:
//!
//! ```text
//!   UI ──pair()──▶ SessionController ──▶ PairDeviceUseCase ──HTTP──▶ host
//!                        │
//!                        ├──connect()──▶ EventChannelConnector ──WS──▶ host
//!                        │                    │
//!                        │◀── channel state ──┘  (republished as Session)
//!                        │
//!   UI ──send()────────▶ ├──▶ ActiveChannel::send  (dropped if not open)
//!   UI ──upload()──────▶ └──▶ TransferFilesUseCase ──HTTP──▶ host
//! ```
//!
//! Every change to the [`Session`] goes through this type, and observers see
//! it through a `tokio::sync::watch` channel.  Nothing else holds a mutable
//! reference to the session or to the live event channel.
//!
//! # Stale channels
//!
//! Each channel the controller opens is tagged with a *generation* number.
//! A background forwarder task copies the channel's state into the session,
//! but only while its generation is still current.  Replacing, disconnecting,
//! or unpairing bumps the generation, so a dying channel can never flip the
//! session back to `Connected` or `Disconnected` behind the new one's back.
//! The check and the session write happen under the same `watch` lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use remote_core::{
    ActionMessage, ChannelState, ConnectionState, InboundEvent, Session, TransferStatus,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::pair_device::{PairDeviceUseCase, PairError, PairingService};
use super::transfer_files::{TransferError, TransferFilesUseCase, TransferService};

/// Default TCP port of the host's HTTP and WebSocket endpoints.
pub const DEFAULT_HOST_PORT: u16 = 8000;

// ── Event channel seam ────────────────────────────────────────────────────────

/// Errors raised while opening an event channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The URL could not be turned into a WebSocket request.
    #[error("invalid event channel URL: {0}")]
    InvalidUrl(String),
    /// TCP connect or WebSocket upgrade failed.
    #[error("event channel handshake failed: {0}")]
    Handshake(String),
    /// The handshake did not finish within the configured timeout.
    #[error("event channel did not open within {0:?}")]
    Timeout(Duration),
}

/// A live event channel.
///
/// Implementations own their socket, writer, reader, and heartbeat tasks.
/// Once the channel reaches [`ChannelState::Closed`] it stays closed.
#[async_trait]
pub trait ActiveChannel: Send + Sync {
    /// Queues `message` for sending.  Silently dropped unless the channel is
    /// `Open`.
    fn send(&self, message: &ActionMessage);

    /// Observes the channel's lifecycle state.
    fn state(&self) -> watch::Receiver<ChannelState>;

    /// Observes the most recent host event.
    fn events(&self) -> watch::Receiver<Option<InboundEvent>>;

    /// Stops the heartbeat, sends a normal-closure frame, and releases the
    /// socket.  Idempotent.
    async fn close(&self);
}

/// Opens event channels.
#[async_trait]
pub trait EventChannelConnector: Send + Sync {
    /// Opens a channel to `url` and returns it once it is `Open`.
    async fn open(&self, url: &str) -> Result<Box<dyn ActiveChannel>, ChannelError>;
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreachable host, timeout, bad status, or malformed response.
    Transport,
    /// A well-formed "no" from the host (or a locally refused input).
    Rejection,
    /// The operation is not valid in the current session state.
    State,
}

/// Error type for session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not paired with a host")]
    NotPaired,
    #[error(transparent)]
    Pair(#[from] PairError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotPaired => ErrorKind::State,
            SessionError::Pair(PairError::Transport(_)) => ErrorKind::Transport,
            SessionError::Pair(PairError::EmptyCode | PairError::Rejected(_)) => {
                ErrorKind::Rejection
            }
            SessionError::Transfer(TransferError::Transport(_)) => ErrorKind::Transport,
            SessionError::Transfer(TransferError::Rejected(_)) => ErrorKind::Rejection,
            SessionError::Channel(_) => ErrorKind::Transport,
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Retry policy for opening the event channel.
///
/// With the default `retries = 0`, `connect()` makes exactly one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling delay.
    pub max_backoff: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(8000),
        }
    }
}

impl ConnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Port used when the host address carries none.
    pub host_port: u16,
    pub connect_policy: ConnectPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            host_port: DEFAULT_HOST_PORT,
            connect_policy: ConnectPolicy::default(),
        }
    }
}

// ── Address helpers ───────────────────────────────────────────────────────────

/// Returns `host` as a `host:port` authority, adding `default_port` when the
/// address has none.  Bare IPv6 addresses are bracketed.
///
/// ```rust
/// use remote_client::application::session_controller::host_authority;
///
/// assert_eq!(host_authority("192.168.1.50", 8000), "192.168.1.50:8000");
/// assert_eq!(host_authority("desk.local:9000", 8000), "desk.local:9000");
/// assert_eq!(host_authority("fe80::1", 8000), "[fe80::1]:8000");
/// ```
pub fn host_authority(host: &str, default_port: u16) -> String {
    let host = host.trim();
    if host.starts_with('[') {
        return if host.contains("]:") {
            host.to_string()
        } else {
            format!("{host}:{default_port}")
        };
    }
    match host.split_once(':') {
        None => format!("{host}:{default_port}"),
        Some((_, port)) if !port.contains(':') && port.parse::<u16>().is_ok() => host.to_string(),
        Some(_) => format!("[{host}]:{default_port}"),
    }
}

/// Builds the event channel URL for a paired device.
pub fn event_channel_url(host: &str, default_port: u16, device_id: &str) -> String {
    format!("ws://{}/ws/{device_id}", host_authority(host, default_port))
}

// ── Controller ────────────────────────────────────────────────────────────────

/// The live channel together with the task that mirrors its state.
struct ChannelLink {
    channel: Box<dyn ActiveChannel>,
    forwarder: JoinHandle<()>,
}

/// The Session Controller.
///
/// All methods take `&self`; wrap the controller in an `Arc` to share it
/// between the UI bridge and background tasks.  Lifecycle operations
/// (`pair`, `connect`, `disconnect`, `unpair`) are serialized internally.
pub struct SessionController {
    pairing: PairDeviceUseCase,
    transfers: TransferFilesUseCase,
    connector: Arc<dyn EventChannelConnector>,
    settings: SessionSettings,
    session: Arc<watch::Sender<Session>>,
    events: Arc<watch::Sender<Option<InboundEvent>>>,
    generation: Arc<AtomicU64>,
    link: Mutex<Option<ChannelLink>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl SessionController {
    pub fn new(
        pairing: Arc<dyn PairingService>,
        transfers: Arc<dyn TransferService>,
        connector: Arc<dyn EventChannelConnector>,
        settings: SessionSettings,
    ) -> Self {
        let (session, _) = watch::channel(Session::new());
        let (events, _) = watch::channel(None);
        Self {
            pairing: PairDeviceUseCase::new(pairing),
            transfers: TransferFilesUseCase::new(transfers),
            connector,
            settings,
            session: Arc::new(session),
            events: Arc::new(events),
            generation: Arc::new(AtomicU64::new(0)),
            link: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    // ── Observers ─────────────────────────────────────────────────────────────

    /// Observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Observes the latest host event.  Only the most recent one is kept.
    pub fn events(&self) -> watch::Receiver<Option<InboundEvent>> {
        self.events.subscribe()
    }

    /// Observes upload and clipboard status.
    pub fn transfers(&self) -> watch::Receiver<TransferStatus> {
        self.transfers.subscribe()
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Pairs with `host` and, on success, opens the event channel.
    ///
    /// Any existing pairing is torn down first.  A failure to open the
    /// channel does not undo the pairing: the device id is still returned
    /// and the failure is left in `last_error`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pair`] when the host could not be reached or
    /// rejected the code.  The session is `Unpaired` afterwards.
    pub async fn pair(&self, code: &str, host: &str) -> Result<String, SessionError> {
        let _guard = self.lifecycle.lock().await;

        if self.session.borrow().is_paired() || self.has_channel() {
            info!("tearing down the previous session before pairing again");
            self.disconnect_locked().await;
        }

        let host = host.trim();
        self.modify(|s| {
            s.begin_pairing(host);
            true
        });

        match self.pairing.execute(code, host).await {
            Ok(device_id) => {
                self.modify(|s| {
                    s.complete_pairing(device_id.clone());
                    true
                });
                if let Err(e) = self.connect_locked().await {
                    warn!("paired but the event channel did not open: {e}");
                }
                Ok(device_id)
            }
            Err(e) => {
                let message = e.to_string();
                self.modify(|s| {
                    s.fail_pairing(message);
                    true
                });
                Err(e.into())
            }
        }
    }

    /// Opens (or reopens) the event channel for the paired host.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPaired`] when no host is paired and
    /// [`SessionError::Channel`] when every attempt allowed by the
    /// [`ConnectPolicy`] failed.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;
        self.connect_locked().await
    }

    /// Closes the event channel.  The pairing is kept.
    pub async fn disconnect(&self) {
        let _guard = self.lifecycle.lock().await;
        self.disconnect_locked().await;
    }

    /// Closes the event channel and forgets the host.
    pub async fn unpair(&self) {
        let _guard = self.lifecycle.lock().await;
        self.disconnect_locked().await;
        self.modify(|s| {
            s.reset();
            true
        });
        info!("unpaired");
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    /// Forwards `message` to the event channel.
    ///
    /// Fire-and-forget: without an open channel the message is dropped and
    /// no error is raised.
    pub fn send(&self, message: ActionMessage) {
        let link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        match link.as_ref() {
            Some(link) => link.channel.send(&message),
            None => debug!(kind = message.kind(), "no event channel; dropping action"),
        }
    }

    /// Uploads a file to the paired host.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotPaired`] without a paired host, otherwise the
    /// transfer failure (also stored in `last_error`).
    pub async fn upload(&self, payload: Vec<u8>, filename: &str) -> Result<(), SessionError> {
        let host = self.paired_host()?;
        let result = self.transfers.upload(payload, filename, &host).await;
        self.mirror(result)
    }

    /// Reads the paired host's clipboard.
    ///
    /// # Errors
    ///
    /// Same as [`upload`](Self::upload).
    pub async fn get_clipboard(&self) -> Result<String, SessionError> {
        let host = self.paired_host()?;
        let result = self.transfers.get_clipboard(&host).await;
        self.mirror(result)
    }

    /// Replaces the paired host's clipboard.
    ///
    /// # Errors
    ///
    /// Same as [`upload`](Self::upload).
    pub async fn set_clipboard(&self, content: &str) -> Result<bool, SessionError> {
        let host = self.paired_host()?;
        let result = self.transfers.set_clipboard(content, &host).await;
        self.mirror(result)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Applies `f` to the session and notifies observers when it returns
    /// `true`.
    fn modify(&self, f: impl FnOnce(&mut Session) -> bool) -> bool {
        let changed = self.session.send_if_modified(f);
        debug_assert!(self.session.borrow().is_consistent());
        changed
    }

    fn has_channel(&self) -> bool {
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn paired_host(&self) -> Result<String, SessionError> {
        self.session
            .borrow()
            .paired_endpoint()
            .map(|(host, _)| host.to_string())
            .ok_or(SessionError::NotPaired)
    }

    fn mirror<T>(&self, result: Result<T, TransferError>) -> Result<T, SessionError> {
        result.map_err(|e| {
            let message = e.to_string();
            self.modify(|s| {
                s.record_error(message);
                true
            });
            SessionError::Transfer(e)
        })
    }

    async fn connect_locked(&self) -> Result<(), SessionError> {
        let (host, device_id) = {
            let session = self.session.borrow();
            let (host, device_id) = session.paired_endpoint().ok_or(SessionError::NotPaired)?;
            (host.to_string(), device_id.to_string())
        };

        // The new generation starts before the old channel closes, so its
        // final `Closed` is ignored.
        let generation = self.begin_generation();
        self.close_channel().await;

        let url = event_channel_url(&host, self.settings.host_port, &device_id);
        info!(url = %url, "opening event channel");

        let policy = self.settings.connect_policy;
        let mut attempt = 0;
        let channel = loop {
            match self.connector.open(&url).await {
                Ok(channel) => break channel,
                Err(e) if attempt < policy.retries => {
                    attempt += 1;
                    let delay = policy.backoff(attempt);
                    warn!(attempt, ?delay, "event channel open failed, retrying: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("event channel open failed: {e}");
                    let message = e.to_string();
                    let generations = Arc::clone(&self.generation);
                    self.modify(|s| {
                        if generations.load(Ordering::SeqCst) != generation {
                            return false;
                        }
                        s.set_connection_state(ConnectionState::Disconnected);
                        s.record_error(message);
                        true
                    });
                    return Err(e.into());
                }
            }
        };

        // A channel that opened supersedes any earlier connect failure.
        let generations = Arc::clone(&self.generation);
        self.modify(|s| {
            if generations.load(Ordering::SeqCst) != generation || s.last_error().is_none() {
                return false;
            }
            s.clear_error();
            true
        });

        let state_rx = channel.state();
        let event_rx = channel.events();
        let initial = *state_rx.borrow();
        apply_channel_state(&self.session, &self.generation, generation, initial);

        let forwarder = tokio::spawn(forward_channel(
            generation,
            Arc::clone(&self.generation),
            Arc::clone(&self.session),
            Arc::clone(&self.events),
            state_rx,
            event_rx,
        ));

        *self.link.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ChannelLink { channel, forwarder });
        Ok(())
    }

    async fn disconnect_locked(&self) {
        let generations = Arc::clone(&self.generation);
        self.modify(|s| {
            generations.fetch_add(1, Ordering::SeqCst);
            s.connection_state() != ConnectionState::Disconnected
                && s.set_connection_state(ConnectionState::Disconnected)
        });
        self.close_channel().await;
        debug!("event channel disconnected");
    }

    /// Starts a new generation and marks the session `Connecting`.
    fn begin_generation(&self) -> u64 {
        let generations = Arc::clone(&self.generation);
        let mut current = 0;
        self.modify(|s| {
            current = generations.fetch_add(1, Ordering::SeqCst) + 1;
            s.set_connection_state(ConnectionState::Connecting)
        });
        current
    }

    async fn close_channel(&self) {
        let link = self
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(link) = link {
            link.channel.close().await;
            link.forwarder.abort();
        }
    }
}

/// Copies a channel state into the session if `generation` is still current.
fn apply_channel_state(
    session: &watch::Sender<Session>,
    generations: &AtomicU64,
    generation: u64,
    state: ChannelState,
) -> bool {
    session.send_if_modified(|s| {
        if generations.load(Ordering::SeqCst) != generation {
            return false;
        }
        let next = state.as_connection_state();
        s.connection_state() != next && s.set_connection_state(next)
    })
}

/// Mirrors one channel's state and events until it closes.
async fn forward_channel(
    generation: u64,
    generations: Arc<AtomicU64>,
    session: Arc<watch::Sender<Session>>,
    events: Arc<watch::Sender<Option<InboundEvent>>>,
    mut state_rx: watch::Receiver<ChannelState>,
    mut event_rx: watch::Receiver<Option<InboundEvent>>,
) {
    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                if apply_channel_state(&session, &generations, generation, state) {
                    info!(?state, "event channel state changed");
                }
                if state == ChannelState::Closed {
                    break;
                }
            }
            changed = event_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = event_rx.borrow_and_update().clone();
                if generations.load(Ordering::SeqCst) == generation {
                    events.send_replace(event);
                }
            }
        }
    }
    debug!(generation, "event channel forwarder finished");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
