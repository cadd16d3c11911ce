//! Game-wide settings shared by every connection handler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Who decides a player's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    /// Points are awarded by the server when `validateAnswer` matches the
    /// stored answer. `updateScore` is ignored.
    #[default]
    #[value(name = "server")]
    ServerAuthoritative,

    /// Clients report their own absolute score with `updateScore`.
    /// `validateAnswer` still answers, but awards nothing.
    #[value(name = "client")]
    ClientReported,
}

/// Settings for the in-room game flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub scoring: ScoringMode,

    /// First value of the pre-game countdown. It counts down to 0.
    pub countdown_from: u32,

    /// Pause after each countdown broadcast.
    pub countdown_step: Duration,

    /// How long a fresh connection may take to send its admission message.
    pub admission_timeout: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringMode::ServerAuthoritative,
            countdown_from: 3,
            countdown_step: Duration::from_secs(1),
            admission_timeout: Duration::from_secs(30),
        }
    }
}
