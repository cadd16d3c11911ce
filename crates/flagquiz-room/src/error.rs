//! Error types for the room layer.

use flagquiz_protocol::{ErrorKind, PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist, or has closed because its last player left.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No more player slots.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Another player in the room already uses this name (case-insensitive).
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    /// The registry already holds its maximum number of rooms.
    #[error("room limit of {0} reached")]
    CapacityExceeded(usize),

    #[error("question index {index} out of range (room has {count} questions)")]
    QuestionIndexOutOfRange { index: i64, count: usize },

    /// The player is not (or no longer) in the room.
    #[error("player {0} not in room")]
    PlayerNotFound(PlayerId),

    /// A send to this player failed; the player has been evicted.
    #[error("delivery to player {0} failed: {1}")]
    DeliveryFailed(PlayerId, String),
}

impl RoomError {
    /// The wire category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::RoomNotFound,
            Self::RoomFull(_) => ErrorKind::RoomFull,
            Self::UsernameTaken(_) => ErrorKind::UsernameTaken,
            Self::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Self::QuestionIndexOutOfRange { .. } => ErrorKind::QuestionIndexOutOfRange,
            Self::PlayerNotFound(_) => ErrorKind::PlayerNotFound,
            Self::DeliveryFailed(..) => ErrorKind::TransportFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(RoomError::NotFound(RoomId::new("0001")).kind(), ErrorKind::RoomNotFound);
        assert_eq!(RoomError::UsernameTaken("Alice".into()).kind(), ErrorKind::UsernameTaken);
        assert_eq!(
            RoomError::DeliveryFailed(PlayerId(1), "gone".into()).kind(),
            ErrorKind::TransportFailure
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = RoomError::QuestionIndexOutOfRange { index: 12, count: 12 };
        assert_eq!(
            err.to_string(),
            "question index 12 out of range (room has 12 questions)"
        );
    }
}
