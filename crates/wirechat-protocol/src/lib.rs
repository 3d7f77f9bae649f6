//! Wire protocol for Wirechat.
//!
//! This crate defines the "language" that the client and the chat server
//! speak:
//!
//! - **Types** ([`Outbound`], [`Inbound`], event payloads) — the
//!   envelopes that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes are
//!   converted to/from bytes.
//! - **Framed halves** ([`FramedSink`], [`FramedStream`]) — a transport
//!   half plus a codec plus a per-call deadline.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Inbound / Outbound) → Client (state machine)
//! ```

mod codec;
mod error;
mod framed;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use framed::{FramedSink, FramedStream};
pub use types::{
    ErrorPayload, EventKind, HelloPayload, HistoryEvent, INBOUND_ERROR, INBOUND_EVENT, Inbound,
    MessageEvent, MsgPayload, Outbound, PROTOCOL_VERSION, RoomPayload, UserEvent,
};
