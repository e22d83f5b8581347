//! JSON codec for event-channel frames.
//!
//! Wire format: one WebSocket *text* frame per message, containing a single
//! JSON object:
//! ```text
//! {"type":"<tag>","data":{...}}
//! ```
//! `data` may be omitted by the host, in which case it decodes as an empty
//! object.  Unknown top-level keys are ignored so the host can add fields
//! without breaking older devices.

use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{ActionMessage, InboundEvent};

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` tag.
    #[error("frame has no string \"type\" field")]
    MissingType,

    /// The `data` field is present but is not an object.
    #[error("\"data\" field must be an object")]
    InvalidData,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`ActionMessage`] into the text of one WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidJson`] if serialization fails, which can
/// only happen if a caller stored a non-finite float in `data`.
///
/// # Examples
///
/// ```rust
/// use remote_core::{encode_action, ActionMessage};
///
/// let text = encode_action(&ActionMessage::ping()).unwrap();
/// assert_eq!(text, r#"{"type":"ping","data":{}}"#);
/// ```
pub fn encode_action(msg: &ActionMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decodes the text of an inbound frame into an [`InboundEvent`].
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing why the frame is not a valid
/// `{type, data}` object.
pub fn decode_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    let (kind, data) = split_frame(text)?;
    Ok(InboundEvent::new(kind, data))
}

/// Decodes the text of an outbound frame back into an [`ActionMessage`].
///
/// The device never needs this; hosts and test doubles do.
///
/// # Errors
///
/// Same as [`decode_inbound`].
pub fn decode_action(text: &str) -> Result<ActionMessage, ProtocolError> {
    let (kind, data) = split_frame(text)?;
    Ok(ActionMessage::new(kind, data))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Validates the frame shape by hand rather than via `#[derive(Deserialize)]`
/// so each failure maps to a distinct [`ProtocolError`] variant.
fn split_frame(text: &str) -> Result<(String, serde_json::Map<String, Value>), ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut obj) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = match obj.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => return Err(ProtocolError::MissingType),
    };

    let data = match obj.remove("data") {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(data)) => data,
        Some(_) => return Err(ProtocolError::InvalidData),
    };

    if !obj.is_empty() {
        trace!("ignoring {} unknown top-level key(s) in {kind} frame", obj.len());
    }

    Ok((kind, data))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
