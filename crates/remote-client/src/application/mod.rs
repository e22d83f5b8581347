//! Application layer use cases for the device client.
//!
//! # What use cases does the client have?
//!
//! - **`pair_device`** – Trades a human-entered pairing code for a device id.
//!   The HTTP exchange itself is performed by a [`PairingService`]
//!   implementation injected at construction time.
//!
//! - **`transfer_files`** – Uploads files and reads/writes the host
//!   clipboard through a [`TransferService`], keeping the observable
//!   [`TransferStatus`](remote_core::TransferStatus) up to date.
//!
//! - **`session_controller`** – Owns the single [`Session`](remote_core::Session),
//!   drives pairing, opens and closes the event channel, and mediates every
//!   outbound action.
//!
//! [`PairingService`]: pair_device::PairingService
//! [`TransferService`]: transfer_files::TransferService

pub mod pair_device;
pub mod session_controller;
pub mod transfer_files;
