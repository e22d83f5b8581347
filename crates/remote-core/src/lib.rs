//! # remote-core
//!
//! Shared library for the remote bridge containing the action-message
//! protocol, its JSON codec, and the session domain entities.
//!
//! This crate is used by the client application and by anything that needs
//! to speak the same wire contract (for example a test host).  It has zero
//! dependencies on sockets, HTTP clients, or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! The remote bridge turns a handheld device into a remote input surface for
//! a desktop *host*.  The device pairs with the host using a short code,
//! then keeps a WebSocket open over which it streams small JSON *action
//! messages* (`mouse_move`, `type_text`, `media_control`, ...).  Files and
//! clipboard text travel over plain HTTP.
//!
//! This crate (`remote-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – What travels over the event channel.  Every frame is a
//!   JSON object `{"type": "...", "data": {...}}`.  Outbound frames are
//!   [`ActionMessage`]s, inbound frames are [`InboundEvent`]s.
//!
//! - **`domain`** – Pure state with no I/O: the [`Session`] (pairing and
//!   connection state machine), upload bookkeeping, and pairing invites
//!   scanned from a QR code.

// Rust will look for each module in a subdirectory with the same name
// (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `remote_core::Session` instead of `remote_core::domain::session::Session`.
pub use domain::invite::{InviteError, PairingInvite};
pub use domain::session::{ChannelState, ConnectionState, PairingState, Session};
pub use domain::transfer::{TransferStatus, UploadState, UploadTask};
pub use protocol::codec::{decode_action, decode_inbound, encode_action, ProtocolError};
pub use protocol::messages::{ActionMessage, InboundEvent};
