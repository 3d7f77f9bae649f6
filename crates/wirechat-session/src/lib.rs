//! Session policy for Wirechat clients.
//!
//! This crate holds the pieces of connection state that outlive a single
//! transport:
//!
//! 1. **Backoff** ([`Backoff`], [`BackoffConfig`]): how long to wait
//!    between reconnection attempts and when to give up
//! 2. **Buffering** ([`OutboundBuffer`]): envelopes written while offline
//! 3. **Subscriptions** ([`JoinedRooms`]): rooms to rejoin after a
//!    reconnect
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← drives the state machine, owns one of each of these
//!     ↕
//! Session Layer (this crate)  ← pure policy, no I/O
//!     ↕
//! Protocol / Transport (below)
//! ```
//!
//! Nothing here is synchronized. The client keeps all of it behind its own
//! lock so a state change and the matching buffer/room update happen in
//! one critical section.

mod backoff;
mod buffer;
mod error;
mod rooms;

pub use backoff::{Backoff, BackoffConfig};
pub use buffer::OutboundBuffer;
pub use error::SessionError;
pub use rooms::JoinedRooms;
