//! Framed halves: a transport half plus a codec plus a per-call deadline.
//!
//! ```text
//! FramedSink::write_frame(&Outbound) → Codec::encode → FrameSink::send
//! FrameStream::recv → Codec::decode → FramedStream::read_frame() -> Inbound
//! ```
//!
//! The deadline is applied to each call separately, never to the life of
//! the connection. Chat traffic can be idle for hours, so the read side is
//! usually built with `None`.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wirechat_transport::{ConnectionId, FrameSink, FrameStream, with_deadline};

use crate::{Codec, ProtocolError};

/// Outbound half that serializes values before sending them.
pub struct FramedSink<S, C> {
    inner: S,
    codec: C,
    deadline: Option<Duration>,
}

impl<S: FrameSink, C: Codec> FramedSink<S, C> {
    pub fn new(inner: S, codec: C, deadline: Option<Duration>) -> Self {
        Self {
            inner,
            codec,
            deadline,
        }
    }

    /// Encodes `value` and sends it as one frame.
    ///
    /// # Errors
    /// `Encode` if serialization fails, `Transport` if the send fails or
    /// the write deadline elapses.
    pub async fn write_frame<T: Serialize + Sync>(&mut self, value: &T) -> Result<(), ProtocolError> {
        let bytes = self.codec.encode(value)?;
        tracing::trace!(id = %self.inner.id(), len = bytes.len(), "writing frame");
        with_deadline(self.deadline, self.inner.send(bytes)).await??;
        Ok(())
    }

    /// Sends a close status and shuts the half down, bounded by the write
    /// deadline.
    pub async fn close(&mut self, reason: &str) -> Result<(), ProtocolError> {
        with_deadline(self.deadline, self.inner.close(reason)).await??;
        Ok(())
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id()
    }
}

/// Inbound half that decodes frames as they arrive.
pub struct FramedStream<R, C> {
    inner: R,
    codec: C,
    deadline: Option<Duration>,
}

impl<R: FrameStream, C: Codec> FramedStream<R, C> {
    pub fn new(inner: R, codec: C, deadline: Option<Duration>) -> Self {
        Self {
            inner,
            codec,
            deadline,
        }
    }

    /// Receives and decodes the next frame.
    ///
    /// Returns `Ok(None)` on a clean close. A frame that fails to decode
    /// yields `Err(Decode)` but leaves the stream usable, so callers can
    /// report it and keep reading.
    pub async fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        let Some(bytes) = with_deadline(self.deadline, self.inner.recv()).await?? else {
            return Ok(None);
        };
        tracing::trace!(id = %self.inner.id(), len = bytes.len(), "read frame");
        self.codec.decode(&bytes).map(Some)
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id()
    }
}
