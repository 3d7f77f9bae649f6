//! Core protocol types for Wirechat's wire format.
//!
//! Every type here travels "on the wire" as a JSON text frame:
//!
//! - [`Outbound`] — client → server: hello, join, leave, msg.
//! - [`Inbound`] — server → client: either a typed event or an error,
//!   never both. Event payloads stay as untyped JSON until a handler asks
//!   for them, so an envelope nobody listens to is never decoded.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version sent in every hello.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Outbound — client → server
// ---------------------------------------------------------------------------

/// First envelope after the socket opens.
///
/// `token` and `user` are omitted from the JSON when absent; the server
/// takes the identity from the token when one is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub protocol: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Subscribes to or unsubscribes from a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: String,
}

/// Publishes a text message to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPayload {
    pub room: String,
    pub text: String,
}

/// A client → server envelope.
///
/// `#[serde(tag = "type", content = "data")]` produces "adjacently tagged"
/// JSON, which is exactly the wire shape the server expects:
///   `{ "type": "join", "data": { "room": "general" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Outbound {
    /// Handshake: protocol version plus credential/identity.
    Hello(HelloPayload),
    /// Subscribe to a room.
    Join(RoomPayload),
    /// Unsubscribe from a room.
    Leave(RoomPayload),
    /// Publish a message.
    Msg(MsgPayload),
}

impl Outbound {
    /// Builds the handshake envelope.
    pub fn hello(protocol: u32, token: Option<String>, user: Option<String>) -> Self {
        Self::Hello(HelloPayload {
            protocol,
            token,
            user,
        })
    }

    pub fn join(room: impl Into<String>) -> Self {
        Self::Join(RoomPayload { room: room.into() })
    }

    pub fn leave(room: impl Into<String>) -> Self {
        Self::Leave(RoomPayload { room: room.into() })
    }

    pub fn msg(room: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Msg(MsgPayload {
            room: room.into(),
            text: text.into(),
        })
    }

    /// The wire tag of this envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello(_) => "hello",
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Msg(_) => "msg",
        }
    }

    /// The room this envelope targets, if any.
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::Hello(_) => None,
            Self::Join(p) | Self::Leave(p) => Some(&p.room),
            Self::Msg(p) => Some(&p.room),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound — server → client
// ---------------------------------------------------------------------------

/// Wire tag of an event envelope.
pub const INBOUND_EVENT: &str = "event";
/// Wire tag of an error envelope.
pub const INBOUND_ERROR: &str = "error";

/// A protocol error reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable snake_case code, e.g. `"unauthorized"`.
    pub code: String,
    /// Human-readable description.
    pub msg: String,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.msg)
    }
}

/// A server → client envelope.
///
/// Kept deliberately loose: `type` is a plain string so an unexpected tag
/// can be reported instead of failing the whole frame, and `data` is raw
/// JSON decoded later by whoever handles the event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Inbound {
    /// Builds an event envelope carrying `data`.
    pub fn event(kind: EventKind, data: Value) -> Self {
        Self {
            kind: INBOUND_EVENT.to_owned(),
            event: Some(kind.as_str().to_owned()),
            data: Some(data),
            error: None,
        }
    }

    /// Builds an error envelope.
    pub fn error(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: INBOUND_ERROR.to_owned(),
            event: None,
            data: None,
            error: Some(ErrorPayload {
                code: code.into(),
                msg: msg.into(),
            }),
        }
    }

    pub fn is_event(&self) -> bool {
        self.kind == INBOUND_EVENT
    }

    pub fn is_error(&self) -> bool {
        self.kind == INBOUND_ERROR
    }

    /// The typed event kind, or `None` for error envelopes and unknown tags.
    pub fn event_kind(&self) -> Option<EventKind> {
        self.event.as_deref().and_then(EventKind::from_tag)
    }
}

/// The event kinds the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    UserJoined,
    UserLeft,
    History,
}

impl EventKind {
    /// Parses a wire tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "message" => Some(Self::Message),
            "user_joined" => Some(Self::UserJoined),
            "user_left" => Some(Self::UserLeft),
            "history" => Some(Self::History),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::History => "history",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// A chat message delivered to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Database id; 0 for messages that were never persisted (guests).
    #[serde(default)]
    pub id: i64,
    pub room: String,
    pub user: String,
    pub text: String,
    /// Unix timestamp assigned by the server.
    pub ts: i64,
}

impl MessageEvent {
    /// Returns `true` if the server did not persist this message.
    pub fn is_ephemeral(&self) -> bool {
        self.id == 0
    }
}

/// Someone joined or left a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub room: String,
    pub user: String,
}

/// Recent messages sent by the server right after a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub room: String,
    /// Oldest first, as ordered by the server.
    #[serde(default)]
    pub messages: Vec<MessageEvent>,
}

// =========================================================================
// Tests
// =========================================================================
