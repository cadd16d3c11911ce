//! Unified error type for the flagquiz server.

use flagquiz_protocol::ProtocolError;
use flagquiz_room::RoomError;
use flagquiz_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each layer's variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FlagQuizError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, name taken, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The question bank could not be loaded or cannot serve a request.
    #[error("question bank: {0}")]
    QuestionBank(String),

    /// Binding a listener or reading a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
