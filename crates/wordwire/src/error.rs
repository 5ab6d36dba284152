//! Error types for the session layer, and the unified façade error.

use std::time::Duration;

use wordwire_protocol::{MessageKind, ProtocolError};
use wordwire_transport::TransportError;

/// Errors raised while binding or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the listening socket failed (port taken, no permission).
    #[error("cannot listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Configuring or inspecting the listener failed.
    #[error("listener setup failed: {0}")]
    Setup(#[source] std::io::Error),

    /// The OS refused to spawn a server worker thread.
    #[error("cannot spawn server worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors raised by session-level operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A round-trip query got no reply of the expected kind in time.
    ///
    /// Timeouts on `try_receive_word` and `number_of_players` are absorbed
    /// into sentinel returns instead; only the explicit round-trip queries
    /// surface this.
    #[error("no {kind} response within {timeout:?}")]
    Timeout { kind: MessageKind, timeout: Duration },

    /// A reply of the expected kind arrived without the matching payload.
    /// Per-kind queues make this unreachable in practice; it exists so the
    /// accessors need no panic path.
    #[error("reply did not carry a {kind} payload")]
    BadReply { kind: MessageKind },

    /// A host-only operation was called on a joined session.
    #[error("only the hosting session can start the game")]
    NotHosting,
}

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of [`Session`](crate::Session) deal with this single type
/// instead of importing errors from each layer. The `#[from]` attribute on
/// each variant auto-generates `From` impls, so the `?` operator converts
/// sub-errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WordwireError {
    /// A transport-level error (connect, send, socket setup).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, name validation).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A server-level error (bind, worker spawn).
    #[error(transparent)]
    Server(#[from] ServerError),

    /// A session-level error (timeout, unsupported operation).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Resolve("nowhere:0".into());
        let wrapped: WordwireError = err.into();
        assert!(matches!(wrapped, WordwireError::Transport(_)));
        assert!(wrapped.to_string().contains("nowhere:0"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidPlayerName("too short".into());
        let wrapped: WordwireError = err.into();
        assert!(matches!(wrapped, WordwireError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let wrapped: WordwireError = SessionError::NotHosting.into();
        assert!(matches!(wrapped, WordwireError::Session(_)));
        assert!(wrapped.to_string().contains("hosting"));
    }

    #[test]
    fn test_timeout_message_names_the_kind() {
        let err = SessionError::Timeout {
            kind: MessageKind::PlayersList,
            timeout: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("PlayersList"));
    }
}
