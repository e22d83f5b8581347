//! Storage infrastructure: client settings persistence.
//!
//! The device never persists its session (pairing is redone on every
//! launch).  The only thing on disk is the client's own settings file,
//! handled by the `config` sub-module:
//!
//! - Resolving where the TOML file lives (flag, environment, platform dir).
//! - Reading it, falling back to defaults when it does not exist yet.
//! - Writing it back when the operator asks for a template.

pub mod config;
