//! Infrastructure layer for the device client.
//!
//! Contains the adapters that talk to the outside world.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `remote_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`host_api`** – `reqwest` client for `/pair`, `/clipboard`, and
//!   `/files/upload`.  Implements `PairingService` and `TransferService`.
//!
//! - **`network`** – `tokio-tungstenite` event channel with its writer,
//!   reader, and heartbeat tasks.  Implements `EventChannelConnector`.
//!
//! - **`storage`** – TOML settings file.
//!
//! - **`ui_bridge`** – serializable command functions a UI can call.

pub mod host_api;
pub mod network;
pub mod storage;
pub mod ui_bridge;
