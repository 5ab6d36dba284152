//! Wire protocol for Wordwire.
//!
//! This crate defines the language peers speak during a typing-game
//! session:
//!
//! - **Types** ([`Request`], [`Response`], [`Packet`], [`MessageKind`], and
//!   the payload values [`Word`], [`PlayerSnapshot`], [`SessionConfig`]) —
//!   the message structures that travel on the wire.
//! - **Wire encoding** ([`encode_packet`], [`PacketStream`]) — one JSON
//!   value per message over a persistent stream, self-delimiting, no
//!   framing.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding,
//!   decoding, or validating.
//!
//! The protocol layer knows nothing about sockets, queues, or sessions —
//! it only defines messages and how they become bytes.

mod error;
mod types;
mod wire;

pub use error::ProtocolError;
pub use types::{
    GameMode, MessageKind, Packet, PlayerSnapshot, Request, RequestBody,
    Response, ResponseBody, SessionConfig, Word, WordKind, now_millis,
    validate_player_name,
};
pub use wire::{PacketStream, encode_packet};
