//! Transport abstraction layer for Wirechat.
//!
//! Provides the [`Connector`] trait that dials a duplex connection and
//! hands it back as two independent halves: a [`FrameSink`] for outbound
//! frames and a [`FrameStream`] for inbound frames. Splitting the halves
//! lets the client read and write concurrently from separate tasks.
//!
//! Deadlines are applied per call with [`with_deadline`]; `None` disables
//! the timeout. Keepalive ping/pong frames never surface to callers.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketSink, WebSocketSource};

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Opaque identifier for a dialed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Dials the remote endpoint and returns the split connection.
pub trait Connector: Send + Sync + 'static {
    /// Outbound half produced by this connector.
    type Sink: FrameSink;
    /// Inbound half produced by this connector.
    type Stream: FrameStream;

    /// Opens a connection to `url`, giving up after `deadline` if set.
    fn connect(
        &self,
        url: &str,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<(Self::Sink, Self::Stream), TransportError>> + Send;
}

/// Outbound half of a connection.
pub trait FrameSink: Send + 'static {
    /// Sends one frame to the remote peer.
    fn send(&mut self, data: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends a normal close status with `reason` and shuts the half down.
    fn close(&mut self, reason: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the identifier of the connection this half belongs to.
    fn id(&self) -> ConnectionId;
}

/// Inbound half of a connection.
pub trait FrameStream: Send + 'static {
    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed (normal or
    /// going-away status, or end of stream).
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Returns the identifier of the connection this half belongs to.
    fn id(&self) -> ConnectionId;
}

/// Runs `fut` with an optional deadline.
///
/// `None` waits forever; `Some(d)` fails with [`TransportError::Timeout`]
/// once `d` has elapsed.
pub async fn with_deadline<F>(
    deadline: Option<Duration>,
    fut: F,
) -> Result<F::Output, TransportError>
where
    F: Future,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout(limit)),
        None => Ok(fut.await),
    }
}
