//! Wire protocol for flagquiz rooms.
//!
//! This crate defines the "language" that browsers and the server speak
//! over a room's WebSocket:
//!
//! - **Types** ([`Admission`], [`ClientEvent`], [`ServerEvent`],
//!   [`ErrorMessage`], etc.) — the JSON shapes that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! engine. It knows nothing about locks, rooms, or connections — only how
//! messages look.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Room engine (players, scores)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Admission, AnswerSubmission, ClientEvent, ErrorKind, ErrorMessage, PlayerId,
    PlayerScore, PlayerSummary, Question, QuestionRequest, RawEvent, RoomId,
    RoomSummary, ScoreReport, ServedQuestion, ServerEvent,
};
