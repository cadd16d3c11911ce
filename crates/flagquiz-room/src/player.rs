//! Player sessions.

use std::sync::Arc;

use flagquiz_protocol::{PlayerId, PlayerScore, PlayerSummary};
use flagquiz_transport::Connection;

/// One admitted client.
///
/// Lives inside its room's player map and is only touched under the room
/// lock. Removing it from the map drops the room's reference to the
/// connection; the handler task holds the other one.
pub(crate) struct PlayerSession<C: Connection> {
    pub(crate) id: PlayerId,
    pub(crate) username: String,
    pub(crate) score: u32,
    pub(crate) connection: Arc<C>,
    /// Index of the last question served to this player.
    pub(crate) cursor: Option<usize>,
    pub(crate) answered: u32,
    pub(crate) correct: u32,
}

impl<C: Connection> PlayerSession<C> {
    pub(crate) fn new(id: PlayerId, username: String, connection: Arc<C>) -> Self {
        Self {
            id,
            username,
            score: 0,
            connection,
            cursor: None,
            answered: 0,
            correct: 0,
        }
    }

    /// Case-insensitive name comparison used at admission.
    pub(crate) fn has_name(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }

    pub(crate) fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            username: self.username.clone(),
            score: self.score,
            id: self.id,
        }
    }

    pub(crate) fn score_row(&self) -> PlayerScore {
        PlayerScore {
            username: self.username.clone(),
            score: self.score,
        }
    }
}
