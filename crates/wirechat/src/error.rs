//! Unified error type for the Wirechat client.
//!
//! Every failure the client surfaces, whether returned from a call or
//! delivered to the error callback, is a [`WirechatError`]. Its
//! [`ErrorKind`] says where it came from:
//!
//! - **Protocol** kinds mirror the codes the server puts in error
//!   envelopes. They are never retried.
//! - **Client** kinds describe what went wrong locally: a dead socket, a
//!   bad configuration, a full buffer.

use std::fmt;
use std::sync::Arc;

use wirechat_protocol::{ErrorPayload, ProtocolError};
use wirechat_session::SessionError;
use wirechat_transport::TransportError;

/// Category of a [`WirechatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A server code this client does not recognise.
    Unknown,

    // Protocol errors (from server error envelopes)
    UnsupportedVersion,
    Unauthorized,
    InvalidMessage,
    BadRequest,
    RoomNotFound,
    AlreadyJoined,
    NotInRoom,
    AccessDenied,
    RateLimited,
    InternalServer,

    // Client-side errors
    Connection,
    Disconnected,
    Timeout,
    InvalidConfig,
    NotConnected,
    Serialization,
    BufferFull,
}

impl ErrorKind {
    /// Maps a wire code to a kind. Unrecognised codes become [`Unknown`](Self::Unknown).
    pub fn from_code(code: &str) -> Self {
        match code {
            "unsupported_version" => Self::UnsupportedVersion,
            "unauthorized" => Self::Unauthorized,
            "invalid_message" => Self::InvalidMessage,
            "bad_request" => Self::BadRequest,
            "room_not_found" => Self::RoomNotFound,
            "already_joined" => Self::AlreadyJoined,
            "not_in_room" => Self::NotInRoom,
            "access_denied" => Self::AccessDenied,
            "rate_limited" => Self::RateLimited,
            "internal_error" => Self::InternalServer,
            _ => Self::Unknown,
        }
    }

    /// The snake_case code for this kind.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::UnsupportedVersion => "unsupported_version",
            Self::Unauthorized => "unauthorized",
            Self::InvalidMessage => "invalid_message",
            Self::BadRequest => "bad_request",
            Self::RoomNotFound => "room_not_found",
            Self::AlreadyJoined => "already_joined",
            Self::NotInRoom => "not_in_room",
            Self::AccessDenied => "access_denied",
            Self::RateLimited => "rate_limited",
            Self::InternalServer => "internal_error",
            Self::Connection => "connection_error",
            Self::Disconnected => "disconnected",
            Self::Timeout => "timeout",
            Self::InvalidConfig => "invalid_config",
            Self::NotConnected => "not_connected",
            Self::Serialization => "serialization_error",
            Self::BufferFull => "buffer_full",
        }
    }

    /// Returns `true` for kinds the server reports in error envelopes.
    pub fn is_protocol(self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion
                | Self::Unauthorized
                | Self::InvalidMessage
                | Self::BadRequest
                | Self::RoomNotFound
                | Self::AlreadyJoined
                | Self::NotInRoom
                | Self::AccessDenied
                | Self::RateLimited
                | Self::InternalServer
        )
    }

    /// Returns `true` for kinds that mean the link itself is unusable.
    pub fn is_connection(self) -> bool {
        matches!(self, Self::Connection | Self::Disconnected | Self::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// An error from the Wirechat client.
///
/// Cheap to clone, so the same error can be returned to the caller, carried
/// in a [`StateEvent`](crate::StateEvent) and published on the event
/// stream. Two errors compare equal when their kinds match.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct WirechatError {
    kind: ErrorKind,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl WirechatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `err` so it stays reachable through [`std::error::Error::source`].
    pub fn wrap<E>(kind: ErrorKind, message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Arc::new(err)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_protocol(&self) -> bool {
        self.kind.is_protocol()
    }

    pub fn is_connection(&self) -> bool {
        self.kind.is_connection()
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub(crate) fn not_connected() -> Self {
        Self::new(ErrorKind::NotConnected, "client is not connected")
    }
}

impl PartialEq for WirechatError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for WirechatError {}

impl From<&ErrorPayload> for WirechatError {
    fn from(payload: &ErrorPayload) -> Self {
        Self::new(ErrorKind::from_code(&payload.code), payload.msg.clone())
    }
}

impl From<TransportError> for WirechatError {
    fn from(err: TransportError) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Connection
        };
        Self::wrap(kind, err.to_string(), err)
    }
}

impl From<ProtocolError> for WirechatError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Transport(inner) => inner.into(),
            other => Self::wrap(ErrorKind::Serialization, other.to_string(), other),
        }
    }
}

impl From<SessionError> for WirechatError {
    fn from(err: SessionError) -> Self {
        let kind = match err {
            SessionError::BufferFull { .. } => ErrorKind::BufferFull,
            SessionError::AttemptsExhausted { .. } => ErrorKind::Connection,
        };
        Self::wrap(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::time::Duration;

    use super::*;

    const PROTOCOL_CODES: [&str; 10] = [
        "unsupported_version",
        "unauthorized",
        "invalid_message",
        "bad_request",
        "room_not_found",
        "already_joined",
        "not_in_room",
        "access_denied",
        "rate_limited",
        "internal_error",
    ];

    #[test]
    fn test_protocol_codes_map_both_ways() {
        for code in PROTOCOL_CODES {
            let kind = ErrorKind::from_code(code);
            assert!(kind.is_protocol(), "{code} should be a protocol kind");
            assert!(!kind.is_connection());
            assert_eq!(kind.as_code(), code);
        }
    }

    #[test]
    fn test_unknown_code() {
        let kind = ErrorKind::from_code("teapot");
        assert_eq!(kind, ErrorKind::Unknown);
        assert!(!kind.is_protocol());
    }

    #[test]
    fn test_connection_predicate() {
        for kind in [ErrorKind::Connection, ErrorKind::Disconnected, ErrorKind::Timeout] {
            assert!(kind.is_connection());
        }
        for kind in [ErrorKind::NotConnected, ErrorKind::BufferFull, ErrorKind::InvalidConfig] {
            assert!(!kind.is_connection());
            assert!(!kind.is_protocol());
        }
    }

    #[test]
    fn test_equality_ignores_message() {
        let a = WirechatError::new(ErrorKind::Unauthorized, "bad token");
        let b = WirechatError::new(ErrorKind::Unauthorized, "expired");
        assert_eq!(a, b);
        assert_ne!(a, WirechatError::new(ErrorKind::AccessDenied, "bad token"));
    }

    #[test]
    fn test_display() {
        let err = WirechatError::new(ErrorKind::RoomNotFound, "no such room: x");
        assert_eq!(err.to_string(), "room_not_found: no such room: x");
    }

    #[test]
    fn test_from_payload() {
        let payload = ErrorPayload {
            code: "rate_limited".into(),
            msg: "slow down".into(),
        };
        let err = WirechatError::from(&payload);
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.message(), "slow down");
    }

    #[test]
    fn test_from_transport_error_keeps_source() {
        let err: WirechatError = TransportError::ConnectionClosed("gone".into()).into();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("gone"));

        let source = err.source().expect("source should be kept");
        assert_eq!(source.to_string(), "connection closed: gone");
    }

    #[test]
    fn test_from_transport_timeout() {
        let err: WirechatError = TransportError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_connection());
    }

    #[test]
    fn test_from_protocol_error() {
        let err: WirechatError = ProtocolError::InvalidMessage("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let err: WirechatError =
            ProtocolError::Transport(TransportError::ConnectionClosed("x".into())).into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_from_session_error() {
        let err: WirechatError = SessionError::BufferFull { capacity: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::BufferFull);

        let err: WirechatError = SessionError::AttemptsExhausted { attempts: 5 }.into();
        assert!(err.is_connection());
    }
}
