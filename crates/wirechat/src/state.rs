//! Connection states and the transitions between them.
//!
//! ```text
//!                 connect()                 hello sent
//!  Disconnected ───────────→ Connecting ──────────────→ Connected
//!   Error, Closed                │ dial/hello failed       │
//!                                ▼                         │ link failed
//!                              Error ←── attempts ──┐      ▼
//!                                        exhausted  │  Disconnected ──→ Reconnecting
//!                                                   └──────────────────────┘ │
//!                                                     Connected ←────────────┘
//!
//!  close() from anywhere ──→ Closed (terminal for automatic transitions)
//! ```

use std::fmt;

use crate::WirechatError;

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
    Closed,
}

impl ConnectionState {
    /// Returns `true` while a connection is being made or in use.
    ///
    /// `connect()` is rejected in these states.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state transition, delivered to the state-change callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    pub old: ConnectionState,
    pub new: ConnectionState,
    /// The failure that caused the transition, if any.
    pub error: Option<WirechatError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_active_states() {
        use ConnectionState::*;
        let active: Vec<_> = [Disconnected, Connecting, Connected, Reconnecting, Error, Closed]
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(active, vec![Connecting, Connected, Reconnecting]);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }
}
