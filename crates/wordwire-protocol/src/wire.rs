//! Self-delimiting wire encoding.
//!
//! One session runs over one persistent byte stream carrying back-to-back
//! JSON values, one [`Packet`] per value, with no length prefix, checksum,
//! or version byte. The decoder finds message boundaries the same way the
//! encoder produced them: by parsing one complete JSON value at a time.
//!
//! Encoding and decoding stay free of socket concerns — [`encode_packet`]
//! yields bytes and [`PacketStream`] runs over any [`io::Read`] — so the
//! transport layer owns all I/O policy.

use std::io;

use serde_json::Value;

use crate::{Packet, ProtocolError};

/// Serializes one packet to the bytes that go on the wire.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(packet).map_err(ProtocolError::Encode)
}

/// An iterator-style decoder over a stream of concatenated packets.
///
/// Values that parse as JSON but not as a [`Packet`] are skipped, keeping
/// the stream aligned on the next value boundary — unknown traffic must
/// never kill a live connection. Only byte-level corruption or I/O failure
/// ends the stream, because after either the value boundaries are gone.
pub struct PacketStream<R: io::Read> {
    values: serde_json::StreamDeserializer<
        'static,
        serde_json::de::IoRead<R>,
        Value,
    >,
}

impl<R: io::Read> PacketStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            values: serde_json::Deserializer::from_reader(reader)
                .into_iter::<Value>(),
        }
    }

    /// Reads the next well-formed packet.
    ///
    /// Returns `Ok(None)` on a clean end of stream. Blocks for as long as
    /// the underlying reader blocks.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` when the stream can no longer be
    /// parsed (corrupt bytes, or the peer vanished mid-value). The stream
    /// must not be used afterwards.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        loop {
            match self.values.next() {
                None => return Ok(None),
                Some(Err(err)) => return Err(ProtocolError::Decode(err)),
                Some(Ok(value)) => {
                    match serde_json::from_value::<Packet>(value) {
                        Ok(packet) => return Ok(Some(packet)),
                        // Well-formed JSON of the wrong shape: drop it.
                        Err(_) => continue,
                    }
                }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
