//! Room and registry configuration.

use flagquiz_protocol::Question;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings fixed when a room is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Display name of the player who created the room.
    pub host: String,

    /// Session length in minutes. Advisory: clients run the clock.
    pub time_limit_minutes: u32,

    /// The question set, indexed by position.
    pub questions: Vec<Question>,
}

impl RoomConfig {
    pub fn new(host: impl Into<String>, time_limit_minutes: u32, questions: Vec<Question>) -> Self {
        Self {
            host: host.into(),
            time_limit_minutes,
            questions,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Capacity limits for the whole registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of live rooms.
    pub max_rooms: usize,

    /// Maximum players in one room.
    pub max_players: usize,

    /// Number of decimal digits in a room code. Codes are zero-padded.
    pub code_digits: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms: 10,
            max_players: 9,
            code_digits: 4,
        }
    }
}

impl RegistryConfig {
    /// How many distinct codes `code_digits` can express.
    pub fn code_space(&self) -> u64 {
        10u64.checked_pow(self.code_digits).unwrap_or(u64::MAX)
    }

    /// The real room limit: `max_rooms`, capped by the code space so code
    /// generation always has a free code to find.
    pub fn room_limit(&self) -> usize {
        let space = usize::try_from(self.code_space()).unwrap_or(usize::MAX);
        self.max_rooms.min(space)
    }
}
