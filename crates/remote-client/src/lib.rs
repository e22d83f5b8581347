//! remote-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does remote-client do? (for beginners)
//!
//! The *device* (a phone or tablet) is the remote control; the *host* is the
//! desktop being controlled.  The device never executes anything itself: it
//! turns touches and button presses into small action messages and ships
//! them to the host.
//!
//! The client library:
//!
//! 1. Pairs with the host by trading the code shown on the host's screen for
//!    a device id (`POST /pair`).
//! 2. Opens a WebSocket *event channel* at `/ws/{device_id}` and keeps it
//!    alive with a `ping` every 30 seconds.
//! 3. Streams `mouse_move`, `type_text`, `media_control`, ... messages over
//!    that channel in the order the UI issued them.
//! 4. Uploads files and reads/writes the host clipboard over plain HTTP.
//!
//! Everything is coordinated by the
//! [`SessionController`](application::session_controller::SessionController),
//! which is the only place that mutates the session state the UI observes.

/// Application layer: use cases and the traits at the I/O seams.
pub mod application;

/// Infrastructure layer: HTTP host API, WebSocket channel, config, UI bridge.
pub mod infrastructure;
