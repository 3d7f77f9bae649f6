//! # Wirechat
//!
//! Async client SDK for the Wirechat realtime chat service.
//!
//! The [`Client`] keeps one WebSocket session to the server: it sends the
//! hello, joins rooms, publishes messages and delivers server events to
//! callbacks or an event stream. With auto-reconnect on, a dropped
//! connection is re-established with exponential backoff, the joined rooms
//! are rejoined and anything written while offline is sent in order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wirechat::prelude::*;
//!
//! # async fn run() -> Result<(), WirechatError> {
//! let config = ClientConfig::new("ws://localhost:8080/ws")
//!     .with_user("alice")
//!     .with_auto_reconnect(true)
//!     .with_buffering(true, 100);
//!
//! let client = Client::new(config);
//! client.on_message(|msg| println!("{}: {}", msg.user, msg.text));
//! client.on_error(|err| eprintln!("wirechat: {err}"));
//!
//! client.connect().await?;
//! client.join("general").await?;
//! client.send("general", "hi all").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! ```text
//! wirechat            ← Client, state machine, dispatcher, errors (this crate)
//! wirechat-session    ← backoff, offline buffer, joined rooms
//! wirechat-protocol   ← envelopes, JSON codec, framed halves
//! wirechat-transport  ← Connector / FrameSink / FrameStream, WebSocket dialer
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
mod event;
mod state;

pub use client::Client;
pub use config::ClientConfig;
pub use dispatcher::Handler;
pub use error::{ErrorKind, WirechatError};
pub use event::Event;
pub use state::{ConnectionState, StateEvent};

pub use wirechat_protocol::{EventKind, HistoryEvent, MessageEvent, PROTOCOL_VERSION, UserEvent};
pub use wirechat_session::BackoffConfig;
pub use wirechat_transport::{Connector, FrameSink, FrameStream, WebSocketConnector};

/// Everything needed for typical use.
pub mod prelude {
    pub use crate::{
        BackoffConfig, Client, ClientConfig, ConnectionState, ErrorKind, Event, HistoryEvent,
        MessageEvent, StateEvent, UserEvent, WirechatError,
    };
}
