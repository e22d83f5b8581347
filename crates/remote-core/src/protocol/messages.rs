//! All remote bridge event-channel message types.
//!
//! Every frame on the event channel is a JSON object with a string `type`
//! tag and a `data` object:
//!
//! ```json
//! {"type":"mouse_move","data":{"dx":12,"dy":-4}}
//! ```
//!
//! The device sends [`ActionMessage`]s; the host sends [`InboundEvent`]s.
//! Neither carries a sequence number: delivery is best effort and relies on
//! the WebSocket preserving write order.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ── Action type tags ──────────────────────────────────────────────────────────

/// String tags for every action type the device sends.
pub mod action_types {
    /// Keepalive heartbeat.
    pub const PING: &str = "ping";
    /// Relative cursor movement.
    pub const MOUSE_MOVE: &str = "mouse_move";
    /// Mouse button click (or press-and-hold when `clicks` is absent).
    pub const MOUSE_CLICK: &str = "mouse_click";
    /// Vertical scroll wheel.
    pub const MOUSE_SCROLL: &str = "mouse_scroll";
    /// Literal text to type on the host.
    pub const TYPE_TEXT: &str = "type_text";
    /// Key chord such as `["ctrl", "c"]`.
    pub const KEY_SHORTCUT: &str = "key_shortcut";
    /// Media transport keys.
    pub const MEDIA_CONTROL: &str = "media_control";
    /// Slide-show navigation.
    pub const PRESENTATION_CONTROL: &str = "presentation_control";
    /// Ask the host to capture its screen.
    pub const SCREENSHOT: &str = "screenshot";

    /// All tags in a stable order.
    pub const ALL: [&str; 9] = [
        PING,
        MOUSE_MOVE,
        MOUSE_CLICK,
        MOUSE_SCROLL,
        TYPE_TEXT,
        KEY_SHORTCUT,
        MEDIA_CONTROL,
        PRESENTATION_CONTROL,
        SCREENSHOT,
    ];
}

// ── Action parameters ─────────────────────────────────────────────────────────

/// Mouse button identifier as it appears in `mouse_click.data.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Returns the wire string for this button.
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

impl TryFrom<&str> for MouseButton {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            _ => Err(()),
        }
    }
}

/// Media key sent in `media_control.data.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Mute,
}

impl MediaAction {
    /// Returns the wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaAction::PlayPause => "play_pause",
            MediaAction::Next => "next",
            MediaAction::Previous => "previous",
            MediaAction::VolumeUp => "volume_up",
            MediaAction::VolumeDown => "volume_down",
            MediaAction::Mute => "mute",
        }
    }
}

impl TryFrom<&str> for MediaAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "play_pause" => Ok(MediaAction::PlayPause),
            "next" => Ok(MediaAction::Next),
            "previous" => Ok(MediaAction::Previous),
            "volume_up" => Ok(MediaAction::VolumeUp),
            "volume_down" => Ok(MediaAction::VolumeDown),
            "mute" => Ok(MediaAction::Mute),
            _ => Err(()),
        }
    }
}

/// Slide-show command sent in `presentation_control.data.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationAction {
    Start,
    Next,
    Previous,
    End,
    Blank,
}

impl PresentationAction {
    /// Returns the wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            PresentationAction::Start => "start",
            PresentationAction::Next => "next",
            PresentationAction::Previous => "previous",
            PresentationAction::End => "end",
            PresentationAction::Blank => "blank",
        }
    }
}

impl TryFrom<&str> for PresentationAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "start" => Ok(PresentationAction::Start),
            "next" => Ok(PresentationAction::Next),
            "previous" => Ok(PresentationAction::Previous),
            "end" => Ok(PresentationAction::End),
            "blank" => Ok(PresentationAction::Blank),
            _ => Err(()),
        }
    }
}

// ── Outbound message ──────────────────────────────────────────────────────────

/// A single device-to-host action.
///
/// Immutable once built: the fields are private and only readable through
/// accessors, so a message handed to the event channel is exactly what the
/// UI constructed.
///
/// # Examples
///
/// ```rust
/// use remote_core::ActionMessage;
///
/// let msg = ActionMessage::mouse_move(4, -2);
/// assert_eq!(msg.kind(), "mouse_move");
/// assert_eq!(msg.data()["dx"], 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Map<String, Value>,
}

impl ActionMessage {
    /// Builds an arbitrary action.  Prefer the typed constructors below for
    /// the actions the host is known to understand.
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Returns the action's type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the action's payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// `true` when this is the keepalive heartbeat.
    pub fn is_ping(&self) -> bool {
        self.kind == action_types::PING
    }

    /// Keepalive heartbeat: `{"type":"ping","data":{}}`.
    pub fn ping() -> Self {
        Self::new(action_types::PING, Map::new())
    }

    /// Relative cursor movement in host pixels.
    pub fn mouse_move(dx: i32, dy: i32) -> Self {
        Self::with_data(action_types::MOUSE_MOVE, json!({ "dx": dx, "dy": dy }))
    }

    /// A click of `button`, repeated `clicks` times (1 = single, 2 = double).
    pub fn mouse_click(button: MouseButton, clicks: u32) -> Self {
        Self::with_data(
            action_types::MOUSE_CLICK,
            json!({ "button": button.as_str(), "clicks": clicks }),
        )
    }

    /// A click without a click count, which the host treats as
    /// press-and-hold (used for drag gestures).
    pub fn mouse_hold(button: MouseButton) -> Self {
        Self::with_data(action_types::MOUSE_CLICK, json!({ "button": button.as_str() }))
    }

    /// Scroll by `clicks` wheel notches; positive scrolls up.
    pub fn mouse_scroll(clicks: i32) -> Self {
        Self::with_data(action_types::MOUSE_SCROLL, json!({ "clicks": clicks }))
    }

    /// Text to be typed verbatim on the host.
    pub fn type_text(text: impl Into<String>) -> Self {
        Self::with_data(action_types::TYPE_TEXT, json!({ "text": text.into() }))
    }

    /// A key chord, e.g. `["ctrl", "c"]`.
    pub fn key_shortcut<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        Self::with_data(action_types::KEY_SHORTCUT, json!({ "keys": keys }))
    }

    /// A media transport key.
    pub fn media_control(action: MediaAction) -> Self {
        Self::with_data(action_types::MEDIA_CONTROL, json!({ "action": action.as_str() }))
    }

    /// A slide-show command.
    pub fn presentation_control(action: PresentationAction) -> Self {
        Self::with_data(
            action_types::PRESENTATION_CONTROL,
            json!({ "action": action.as_str() }),
        )
    }

    /// Ask the host to take a screenshot.
    pub fn screenshot() -> Self {
        Self::new(action_types::SCREENSHOT, Map::new())
    }

    fn with_data(kind: &str, data: Value) -> Self {
        // Every `json!` literal above is an object.
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(kind, data)
    }
}

// ── Inbound message ───────────────────────────────────────────────────────────

/// A host-to-device message.
///
/// The transport layer only looks at the type tag; interpreting `data` is
/// left to whoever observes the session's "last event" slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Map<String, Value>,
}

impl InboundEvent {
    /// Builds an event; mostly useful for tests and fake hosts.
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Returns the event's type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the event's payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
