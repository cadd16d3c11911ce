//! Message types for the room WebSocket and the HTTP room API.
//!
//! Every type here is serialized to JSON and read by the browser client,
//! so field names and tags are part of the public contract. The tests at
//! the bottom pin the exact JSON shapes.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a player session, assigned by the room at join time.
///
/// Unique within its room. `#[serde(transparent)]` puts it on the wire as
/// a bare number: `PlayerId(7)` is just `7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type to join a room, e.g. `"0427"`.
///
/// Opaque to everything except the registry that generates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a room code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// One quiz question. Immutable once a room is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Image reference for the flag, e.g. `/static/svg/fr.svg`.
    #[serde(rename = "flag_url")]
    pub prompt: String,
    /// Candidate answers in display order. Empty for type-in games.
    pub options: Vec<String>,
    /// The ground-truth answer.
    pub answer: String,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// The first message on every room connection.
///
/// The browser client also sends `"event": "joinRoom"` alongside; unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub username: String,
    #[serde(rename = "roomId", alias = "roomID")]
    pub room_id: RoomId,
}

/// An event frame before its payload is interpreted: `{event, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of `getNewQuestion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Zero-based question position. Signed so that a negative index is
    /// reported as out of range instead of as a malformed message.
    #[serde(alias = "questionNumber", alias = "question_number")]
    pub index: i64,
}

/// Payload of `validateAnswer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// Zero-based position of the question being answered.
    #[serde(alias = "questionIndex", alias = "index")]
    pub question: i64,
    pub answer: String,
}

/// Payload of `updateScore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u32,
}

/// A recognized in-session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Leave,
    LoadGame,
    GetNewQuestion(QuestionRequest),
    ValidateAnswer(AnswerSubmission),
    UpdateScore(ScoreReport),
}

impl ClientEvent {
    /// Interprets a raw frame.
    ///
    /// Returns `Ok(None)` for tags this server does not know; those are
    /// ignored rather than treated as errors. A known tag with a payload of
    /// the wrong shape is a [`ProtocolError::Decode`].
    ///
    /// Payloads may arrive either as a JSON object or as a string holding
    /// JSON, which older clients produce with a second `JSON.stringify`.
    pub fn from_raw(raw: RawEvent) -> Result<Option<Self>, ProtocolError> {
        let data = unwrap_string_payload(raw.data);
        let event = match raw.event.as_str() {
            "leave" => Self::Leave,
            "loadgame" | "loadGame" => Self::LoadGame,
            "getNewQuestion" | "get_new_question" => Self::GetNewQuestion(from_data(data)?),
            "validateAnswer" | "validate_answer" => Self::ValidateAnswer(from_data(data)?),
            "updateScore" | "update_score" => Self::UpdateScore(from_data(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The canonical tag, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::LoadGame => "loadgame",
            Self::GetNewQuestion(_) => "getNewQuestion",
            Self::ValidateAnswer(_) => "validateAnswer",
            Self::UpdateScore(_) => "updateScore",
        }
    }
}

fn from_data<T: DeserializeOwned>(data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(ProtocolError::Decode)
}

fn unwrap_string_payload(data: Value) -> Value {
    if let Value::String(text) = &data {
        if let Ok(inner) = serde_json::from_str::<Value>(text) {
            return inner;
        }
    }
    data
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A player as announced to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub username: String,
    pub score: u32,
    pub id: PlayerId,
}

/// Payload of `newQuestion`: the question plus its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServedQuestion {
    pub index: usize,
    #[serde(flatten)]
    pub question: Question,
}

/// Events pushed to clients.
///
/// Adjacently tagged, so `Countdown(3)` is `{"event":"countdown","data":3}`
/// and `GameStarted` is just `{"event":"gameStarted"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    PlayerJoined(PlayerSummary),
    PlayerLeft {
        username: String,
        id: PlayerId,
    },
    Countdown(u32),
    GameStarted,
    NewQuestion(ServedQuestion),
    AnswerResult {
        correct_answer: String,
        chosen_answer: String,
    },
    ScoreUpdated(PlayerSummary),
}

/// Stable machine-readable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    RoomNotFound,
    RoomFull,
    UsernameTaken,
    CapacityExceeded,
    QuestionIndexOutOfRange,
    PlayerNotFound,
    MalformedMessage,
    TransportFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RoomNotFound => "RoomNotFound",
            Self::RoomFull => "RoomFull",
            Self::UsernameTaken => "UsernameTaken",
            Self::CapacityExceeded => "CapacityExceeded",
            Self::QuestionIndexOutOfRange => "QuestionIndexOutOfRange",
            Self::PlayerNotFound => "PlayerNotFound",
            Self::MalformedMessage => "MalformedMessage",
            Self::TransportFailure => "TransportFailure",
        };
        f.write_str(name)
    }
}

/// Error payload: `{"error": "room 1234 not found", "kind": "RoomNotFound"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorMessage {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP payloads
// ---------------------------------------------------------------------------

/// A player row in a room summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub username: String,
    pub score: u32,
}

/// Room summary returned by the HTTP room API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: RoomId,
    pub host: String,
    pub players: Vec<PlayerScore>,
    /// Minutes.
    pub time_limit: u32,
    pub num_questions: usize,
    #[serde(rename = "gameStarted")]
    pub started: bool,
}
