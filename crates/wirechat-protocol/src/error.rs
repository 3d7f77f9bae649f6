//! Error types for the protocol layer.
//!
//! Each crate in Wirechat defines its own error enum. A `ProtocolError`
//! means a frame could not be turned into (or out of) an envelope, or the
//! socket underneath the framed halves failed while moving it.

use wirechat_transport::TransportError;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or wrong
    /// data types inside an event payload.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame decoded but violates protocol rules, e.g. an error
    /// envelope with no error payload or an unknown envelope type.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The socket below the framed halves failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProtocolError {
    /// Returns `true` for failures that concern a single frame's content
    /// rather than the connection carrying it.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::InvalidMessage(_))
    }
}
