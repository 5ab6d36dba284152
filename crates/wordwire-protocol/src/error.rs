//! Error types for the protocol layer.
//!
//! Each crate in Wordwire defines its own error enum, so a `ProtocolError`
//! always means a serialization or validation problem, never a networking
//! one.

/// Errors that can occur while encoding, decoding, or validating messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed. Wire types are plain data, so this only
    /// happens when something is badly broken upstream.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The byte stream can no longer be parsed: corrupt data, or the
    /// connection dropped in the middle of a value.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The configured player name violates the 3-20 character rule.
    #[error("invalid player name: {0}")]
    InvalidPlayerName(String),
}
