//! The device's single remote session.
//!
//! A [`Session`] answers three questions for the UI: *which host are we
//! paired with*, *is the event channel up*, and *what went wrong last*.
//!
//! # State machine
//!
//! ```text
//! pairing:     Unpaired ──begin──▶ Pairing ──complete──▶ Paired
//!                 ▲                   │                    │
//!                 └──────fail─────────┘◀──────reset────────┘
//!
//! connection:  Idle ─▶ Connecting ─▶ Connected ─▶ Disconnected ─▶ Connecting ...
//! ```
//!
//! # Invariants
//!
//! 1. `connection_state` is `Connecting` or `Connected` only while
//!    `pairing_state == Paired`.
//! 2. `device_id` is `Some` if and only if `pairing_state == Paired`.
//!
//! Every mutator below preserves both.  [`Session::is_consistent`] checks them.

use serde::{Deserialize, Serialize};

/// Where the device is in the pairing handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairingState {
    /// No host; the user has to enter a code.
    #[default]
    Unpaired,
    /// A pairing request is in flight.
    Pairing,
    /// The host issued a device id.
    Paired,
}

/// Connection state of the event channel as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Never connected in this session.
    #[default]
    Idle,
    /// The WebSocket handshake is in progress.
    Connecting,
    /// The event channel is open.
    Connected,
    /// The channel was closed, failed, or was never established after pairing.
    Disconnected,
}

/// Lifecycle of a single event-channel connection.
///
/// `Closed` is both the initial and the terminal state; a channel is never
/// reopened; the controller builds a fresh one instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelState {
    #[default]
    Closed,
    Opening,
    Open,
}

impl ChannelState {
    /// Maps a channel state onto the session-level connection state.
    pub fn as_connection_state(self) -> ConnectionState {
        match self {
            ChannelState::Closed => ConnectionState::Disconnected,
            ChannelState::Opening => ConnectionState::Connecting,
            ChannelState::Open => ConnectionState::Connected,
        }
    }
}

/// The single pairing/connection record of the device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    host: Option<String>,
    device_id: Option<String>,
    pairing_state: PairingState,
    connection_state: ConnectionState,
    last_error: Option<String>,
}

impl Session {
    /// Creates an empty, unpaired session.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn pairing_state(&self) -> PairingState {
        self.pairing_state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_paired(&self) -> bool {
        self.pairing_state == PairingState::Paired
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Returns the `(host, device_id)` pair when paired.
    pub fn paired_endpoint(&self) -> Option<(&str, &str)> {
        match (&self.host, &self.device_id) {
            (Some(host), Some(id)) if self.is_paired() => Some((host, id)),
            _ => None,
        }
    }

    /// Human-readable connection status for status bars.
    pub fn status_label(&self) -> &'static str {
        match self.connection_state {
            ConnectionState::Idle => "Not Connected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
        }
    }

    /// Returns `true` when both session invariants hold.
    pub fn is_consistent(&self) -> bool {
        let live = matches!(
            self.connection_state,
            ConnectionState::Connecting | ConnectionState::Connected
        );
        let connection_ok = !live || self.is_paired();
        let device_ok = self.device_id.is_some() == self.is_paired();
        connection_ok && device_ok
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    /// Enters `Pairing` against `host`, forgetting any previous pairing.
    ///
    /// A previously live connection state is demoted to `Disconnected`; the
    /// caller is expected to have closed the old channel already.
    pub fn begin_pairing(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
        self.device_id = None;
        self.pairing_state = PairingState::Pairing;
        self.last_error = None;
        if matches!(
            self.connection_state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.connection_state = ConnectionState::Disconnected;
        }
    }

    /// Completes pairing with the id the host issued.
    pub fn complete_pairing(&mut self, device_id: impl Into<String>) {
        self.device_id = Some(device_id.into());
        self.pairing_state = PairingState::Paired;
    }

    /// Reverts to `Unpaired` and records why.
    pub fn fail_pairing(&mut self, error: impl Into<String>) {
        self.host = None;
        self.device_id = None;
        self.pairing_state = PairingState::Unpaired;
        self.last_error = Some(error.into());
    }

    /// Updates the connection state.
    ///
    /// Returns `false` (and changes nothing) when the update would make the
    /// connection live while the session is not paired.
    pub fn set_connection_state(&mut self, state: ConnectionState) -> bool {
        let live = matches!(state, ConnectionState::Connecting | ConnectionState::Connected);
        if live && !self.is_paired() {
            return false;
        }
        self.connection_state = state;
        true
    }

    /// Stores an error message for passive display.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Clears the last error.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Tears the session down to `{Unpaired, no host, no device, Disconnected}`.
    pub fn reset(&mut self) {
        *self = Self {
            connection_state: ConnectionState::Disconnected,
            ..Self::default()
        };
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn paired_session() -> Session {
        let mut s = Session::new();
        s.begin_pairing("192.168.1.50");
        s.complete_pairing("dev-9");
        s
    }

    #[test]
    fn test_new_session_is_unpaired_idle_and_consistent() {
        let s = Session::new();
        assert_eq!(s.pairing_state(), PairingState::Unpaired);
        assert_eq!(s.connection_state(), ConnectionState::Idle);
        assert!(s.host().is_none());
        assert!(s.device_id().is_none());
        assert!(s.is_consistent());
    }

    #[test]
    fn test_begin_pairing_stores_host_without_device_id() {
        // Arrange
        let mut s = Session::new();

        // Act
        s.begin_pairing("desk.local");

        // Assert
        assert_eq!(s.pairing_state(), PairingState::Pairing);
        assert_eq!(s.host(), Some("desk.local"));
        assert!(s.device_id().is_none());
        assert!(s.is_consistent());
    }

    #[test]
    fn test_complete_pairing_sets_device_id() {
        let s = paired_session();
        assert!(s.is_paired());
        assert_eq!(s.paired_endpoint(), Some(("192.168.1.50", "dev-9")));
        assert!(s.is_consistent());
    }

    #[test]
    fn test_fail_pairing_reverts_and_records_error() {
        let mut s = Session::new();
        s.begin_pairing("10.0.0.2");

        s.fail_pairing("Invalid code");

        assert_eq!(s.pairing_state(), PairingState::Unpaired);
        assert!(s.host().is_none());
        assert_eq!(s.last_error(), Some("Invalid code"));
        assert!(s.is_consistent());
    }

    #[test]
    fn test_connected_rejected_while_unpaired() {
        let mut s = Session::new();

        let applied = s.set_connection_state(ConnectionState::Connected);

        assert!(!applied);
        assert_eq!(s.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_disconnected_allowed_while_unpaired() {
        let mut s = Session::new();
        assert!(s.set_connection_state(ConnectionState::Disconnected));
        assert!(s.is_consistent());
    }

    #[test]
    fn test_begin_pairing_demotes_live_connection() {
        // Arrange: a connected session
        let mut s = paired_session();
        assert!(s.set_connection_state(ConnectionState::Connected));

        // Act: re-pair against a different host
        s.begin_pairing("10.0.0.9");

        // Assert
        assert_eq!(s.connection_state(), ConnectionState::Disconnected);
        assert!(s.is_consistent());
    }

    #[test]
    fn test_reset_returns_to_unpaired_disconnected() {
        let mut s = paired_session();
        s.set_connection_state(ConnectionState::Connected);
        s.record_error("boom");

        s.reset();

        assert_eq!(s.pairing_state(), PairingState::Unpaired);
        assert_eq!(s.connection_state(), ConnectionState::Disconnected);
        assert!(s.host().is_none());
        assert!(s.device_id().is_none());
        assert!(s.last_error().is_none());
    }

    #[test]
    fn test_clear_error_keeps_pairing() {
        let mut s = paired_session();
        s.record_error("event channel handshake failed");

        s.clear_error();

        assert!(s.last_error().is_none());
        assert!(s.is_paired());
        assert!(s.is_consistent());
    }

    #[test]
    fn test_status_label_tracks_connection_state() {
        let mut s = paired_session();
        assert_eq!(s.status_label(), "Not Connected");
        s.set_connection_state(ConnectionState::Connecting);
        assert_eq!(s.status_label(), "Connecting");
        s.set_connection_state(ConnectionState::Connected);
        assert_eq!(s.status_label(), "Connected");
        s.set_connection_state(ConnectionState::Disconnected);
        assert_eq!(s.status_label(), "Disconnected");
    }

    #[test]
    fn test_channel_state_maps_to_connection_state() {
        assert_eq!(ChannelState::Closed.as_connection_state(), ConnectionState::Disconnected);
        assert_eq!(ChannelState::Opening.as_connection_state(), ConnectionState::Connecting);
        assert_eq!(ChannelState::Open.as_connection_state(), ConnectionState::Connected);
    }
}
