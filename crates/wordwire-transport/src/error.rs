/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote address could not be resolved to anything connectable.
    #[error("cannot resolve {0}")]
    Resolve(String),

    /// Opening the connection failed (refused, unreachable, timed out).
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Duplicating or configuring the socket failed.
    #[error("socket setup failed: {0}")]
    Setup(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// A message could not be encoded for the wire.
    #[error(transparent)]
    Protocol(#[from] wordwire_protocol::ProtocolError),
}
