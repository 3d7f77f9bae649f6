//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw frame
//! bytes. The framed halves don't care HOW envelopes are serialized; they
//! only need something that implements [`Codec`].
//!
//! The chat server speaks JSON text frames, so [`JsonCodec`] is the one
//! the client uses.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside the long-running
/// read and write tasks, which Tokio may move between worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use wirechat_protocol::{Codec, JsonCodec, Outbound};
///
/// let codec = JsonCodec;
/// let frame = Outbound::join("general");
///
/// let bytes = codec.encode(&frame).unwrap();
/// assert_eq!(bytes, br#"{"type":"join","data":{"room":"general"}}"#);
///
/// let decoded: Outbound = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Inbound;

    #[test]
    fn test_decode_malformed_bytes_returns_decode_error() {
        let result: Result<Inbound, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_shape_returns_decode_error() {
        // `type` is required on every inbound envelope.
        let result: Result<Inbound, _> = JsonCodec.decode(br#"{"event":"message"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
