//! HTTP room API.
//!
//! Rooms are created and looked up over plain HTTP; the game itself runs
//! over the WebSocket listener. Every error body is `{"error": "..."}`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use flagquiz_protocol::{ErrorKind, RoomId, RoomSummary};
use flagquiz_room::{RoomConfig, RoomError, RoomRegistry};
use flagquiz_transport::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::handler::validate_username;
use crate::{GameType, QuestionBank};

/// Allowed session lengths, in minutes.
pub const TIME_LIMIT_MINUTES: std::ops::RangeInclusive<u32> = 3..=10;

/// Allowed question counts per room.
pub const QUESTION_COUNT: std::ops::RangeInclusive<usize> = 10..=25;

/// State shared by the HTTP handlers.
pub struct HttpState<C: Connection> {
    pub registry: Arc<RoomRegistry<C>>,
    pub questions: Arc<QuestionBank>,
}

/// Builds the `/api` router.
pub fn router<C: Connection>(state: Arc<HttpState<C>>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/createroom", post(create_room::<C>))
        .route("/api/joinroom", post(join_room::<C>))
        .route("/api/room/{id}", get(get_room::<C>))
        .route("/api/admin/rooms", get(list_rooms::<C>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error response: a status code plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        let status = match err.kind() {
            ErrorKind::RoomNotFound => StatusCode::NOT_FOUND,
            ErrorKind::RoomFull | ErrorKind::UsernameTaken => StatusCode::CONFLICT,
            ErrorKind::CapacityExceeded => StatusCode::FORBIDDEN,
            ErrorKind::MalformedMessage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::bad_request("Invalid JSON format")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub time_limit: u32,
    pub num_questions: usize,
    #[serde(default)]
    pub game_type: GameType,
    #[serde(default)]
    pub host_username: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub username: String,
    #[serde(rename = "roomID", alias = "roomId")]
    pub room_id: String,
}

/// Response to a successful room creation.
#[derive(Debug, Serialize)]
pub struct CreatedRoom {
    #[serde(flatten)]
    pub room: RoomSummary,
    /// Always `false`: a fresh room waits for `loadgame`.
    pub start: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_room<C: Connection>(
    State(state): State<Arc<HttpState<C>>>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<Json<CreatedRoom>, ApiError> {
    let Json(req) = payload?;

    if !TIME_LIMIT_MINUTES.contains(&req.time_limit) {
        return Err(ApiError::bad_request(format!(
            "time limit must be between {} and {} minutes",
            TIME_LIMIT_MINUTES.start(),
            TIME_LIMIT_MINUTES.end()
        )));
    }
    if !QUESTION_COUNT.contains(&req.num_questions) {
        return Err(ApiError::bad_request(format!(
            "number of questions must be between {} and {}",
            QUESTION_COUNT.start(),
            QUESTION_COUNT.end()
        )));
    }
    let host = validate_username(&req.host_username)
        .map_err(|_| ApiError::bad_request("host username must be between 4 and 10 characters"))?;

    let questions = state
        .questions
        .generate(req.num_questions, req.game_type)
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("failed to generate questions: {e}"),
        })?;

    let room_id = state
        .registry
        .create_room(RoomConfig::new(host, req.time_limit, questions))
        .await?;
    let room = state.registry.get_room(&room_id).await?;

    Ok(Json(CreatedRoom {
        room: room.summary().await,
        start: false,
    }))
}

async fn join_room<C: Connection>(
    State(state): State<Arc<HttpState<C>>>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<Json<RoomSummary>, ApiError> {
    let Json(req) = payload?;

    let username = validate_username(&req.username)
        .map_err(|_| ApiError::bad_request("username must be between 4 and 10 characters"))?;
    let code = req.room_id.trim();
    if code.is_empty() {
        return Err(ApiError::bad_request("room ID is required"));
    }

    let room = state.registry.get_room(&RoomId::new(code)).await?;
    room.can_admit(username).await?;
    Ok(Json(room.summary().await))
}

async fn get_room<C: Connection>(
    State(state): State<Arc<HttpState<C>>>,
    Path(id): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let room = state.registry.get_room(&RoomId::new(id)).await?;
    Ok(Json(room.summary().await))
}

async fn list_rooms<C: Connection>(
    State(state): State<Arc<HttpState<C>>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rooms = state.registry.summaries().await;
    if rooms.is_empty() {
        return Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: "no rooms found".into(),
        });
    }
    Ok(Json(json!({ "rooms": rooms })))
}
