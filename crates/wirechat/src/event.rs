//! Events published on [`Client::events`](crate::Client::events).

use wirechat_protocol::{HistoryEvent, MessageEvent, UserEvent};

use crate::{StateEvent, WirechatError};

/// Everything the client can tell a subscriber about.
///
/// Each variant matches one of the callbacks on [`Client`](crate::Client).
/// Subscribers that fall behind lose the oldest events.
#[derive(Debug, Clone)]
pub enum Event {
    Message(MessageEvent),
    UserJoined(UserEvent),
    UserLeft(UserEvent),
    History(HistoryEvent),
    Error(WirechatError),
    StateChanged(StateEvent),
}

impl Event {
    /// The room the event belongs to, if it is a room event.
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(&m.room),
            Self::UserJoined(u) | Self::UserLeft(u) => Some(&u.room),
            Self::History(h) => Some(&h.room),
            Self::Error(_) | Self::StateChanged(_) => None,
        }
    }
}
