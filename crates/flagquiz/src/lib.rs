//! # flagquiz
//!
//! Real-time multiplayer flag quiz server.
//!
//! Players create a room over HTTP, then connect to the WebSocket listener,
//! send `{username, roomId}` to join, and play: everyone in the room sees
//! the countdown, each player pulls questions at their own pace, and every
//! correct answer is broadcast as a score update.
//!
//! The crate ties the layers together:
//!
//! ```text
//! flagquiz-transport → flagquiz-protocol → flagquiz-room → flagquiz
//!   (connections)        (JSON events)       (registry)     (handlers, HTTP)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flagquiz::prelude::*;
//!
//! # async fn run() -> Result<(), FlagQuizError> {
//! let server = QuizServer::builder()
//!     .bind("127.0.0.1:8081")
//!     .http("127.0.0.1:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod http;
pub mod logging;
mod questions;
mod server;

pub use config::{GameSettings, ScoringMode};
pub use error::FlagQuizError;
pub use questions::{GameType, QuestionBank};
pub use server::{DEFAULT_ABANDONED_ROOM_TTL, QuizServer, QuizServerBuilder};

/// Everything needed to embed or test a server.
pub mod prelude {
    pub use crate::{
        FlagQuizError, GameSettings, GameType, QuestionBank, QuizServer, QuizServerBuilder,
        ScoringMode,
    };
    pub use flagquiz_protocol::{
        Admission, ClientEvent, ErrorKind, ErrorMessage, PlayerId, Question, RoomId, RoomSummary,
        ServerEvent,
    };
    pub use flagquiz_room::{RegistryConfig, RoomConfig, RoomError, RoomRegistry};
}
