//! Protocol module containing message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_action, decode_inbound, encode_action, ProtocolError};
pub use messages::*;
