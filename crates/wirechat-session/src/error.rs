//! Error types for the session layer.

/// Errors raised by the reconnection and buffering policy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The outbound buffer already holds `capacity` envelopes.
    /// The rejected envelope was not stored.
    #[error("outbound buffer full ({capacity} messages)")]
    BufferFull { capacity: usize },

    /// The configured number of reconnection attempts has been used up.
    #[error("gave up reconnecting after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}
