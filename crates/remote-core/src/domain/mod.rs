//! Domain entities for the remote bridge.
//!
//! This module contains pure state with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from network libraries, HTTP clients, or async runtimes.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the rules are the pairing/connection state machine of a [`session::Session`],
//! the lifecycle of an upload, and the format of a scanned pairing invite.
//! The client's application layer drives these types; it never bypasses them.

/// Pairing and connection state machine.
pub mod session;

/// Upload bookkeeping and the observer-facing transfer status.
pub mod transfer;

/// Pairing invites carried by QR codes.
pub mod invite;
