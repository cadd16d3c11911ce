//! A single game session.
//!
//! A [`Room`] is shared (`Arc<Room<C>>`) by every connection handler that
//! joined it. Immutable settings live directly on the struct; everything
//! that changes (players, the started flag, the closed flag) sits behind
//! one `tokio::sync::Mutex` so that a check-then-insert such as "is the
//! name free? then add the player" can never interleave with another
//! handler doing the same.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use flagquiz_protocol::{PlayerId, PlayerSummary, Question, RoomId, RoomSummary};
use flagquiz_transport::Connection;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::player::PlayerSession;
use crate::{RoomConfig, RoomError};

/// Mutable room state. Only reachable through `Room::inner`.
pub(crate) struct RoomInner<C: Connection> {
    pub(crate) started: bool,
    /// Set once the room has emptied. Never cleared.
    pub(crate) closed: bool,
    /// Ordered by id, so broadcasts and summaries follow join order.
    pub(crate) players: BTreeMap<PlayerId, PlayerSession<C>>,
    next_player_id: u64,
    created_at: Instant,
}

/// Result of [`Room::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The removed player, or `None` if it was already gone.
    pub player: Option<PlayerSummary>,
    /// Players still in the room.
    pub remaining: usize,
}

impl Departure {
    /// `true` when the room is now empty and should leave the registry.
    pub fn room_emptied(&self) -> bool {
        self.remaining == 0
    }
}

/// Result of [`Room::check_answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheck {
    /// The stored answer.
    pub correct_answer: String,
    /// What the player sent, verbatim.
    pub chosen_answer: String,
    pub is_correct: bool,
}

/// One game session.
pub struct Room<C: Connection> {
    id: RoomId,
    host: String,
    time_limit_minutes: u32,
    questions: Vec<Question>,
    max_players: usize,
    pub(crate) inner: Mutex<RoomInner<C>>,
}

impl<C: Connection> Room<C> {
    /// Creates an empty, not-started room.
    pub fn new(id: RoomId, config: RoomConfig, max_players: usize) -> Self {
        Self {
            id,
            host: config.host,
            time_limit_minutes: config.time_limit_minutes,
            questions: config.questions,
            max_players,
            inner: Mutex::new(RoomInner {
                started: false,
                closed: false,
                players: BTreeMap::new(),
                next_player_id: 1,
                created_at: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Admits a player.
    ///
    /// Checks run in order under the room lock: a closed room is
    /// [`RoomError::NotFound`], a full room is [`RoomError::RoomFull`], and
    /// a name already present (ignoring case) is
    /// [`RoomError::UsernameTaken`]. A rejected join leaves the room
    /// unchanged.
    pub async fn join(
        &self,
        connection: Arc<C>,
        username: &str,
    ) -> Result<PlayerSummary, RoomError> {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            return Err(RoomError::NotFound(self.id.clone()));
        }
        if inner.players.len() >= self.max_players {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        if inner.players.values().any(|p| p.has_name(username)) {
            return Err(RoomError::UsernameTaken(username.to_owned()));
        }

        let id = PlayerId(inner.next_player_id);
        inner.next_player_id += 1;
        let session = PlayerSession::new(id, username.to_owned(), connection);
        let summary = session.summary();
        inner.players.insert(id, session);

        tracing::info!(
            room_id = %self.id,
            player_id = %id,
            %username,
            players = inner.players.len(),
            "player joined"
        );
        Ok(summary)
    }

    /// Removes a player. Calling it again for the same player is a no-op
    /// that reports `player: None`.
    ///
    /// When the room ends up empty it is marked closed, so no later join
    /// can land in it. Removing it from the registry is the caller's job,
    /// after this returns and the room lock is released.
    pub async fn leave(&self, player_id: PlayerId) -> Departure {
        let mut inner = self.inner.lock().await;

        let removed = inner.players.remove(&player_id);
        let remaining = inner.players.len();
        if remaining == 0 {
            inner.closed = true;
        }

        if let Some(session) = &removed {
            tracing::info!(
                room_id = %self.id,
                %player_id,
                username = %session.username,
                score = session.score,
                answered = session.answered,
                correct = session.correct,
                remaining,
                "player left"
            );
        }

        Departure {
            player: removed.map(|s| s.summary()),
            remaining,
        }
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.players.len()
    }

    /// `true` once the room emptied (or was swept) and stopped admitting.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Closes the room if nobody has joined it within `ttl` of creation.
    ///
    /// Returns `true` if the room is closed and empty after the call,
    /// including a room that was already closed.
    pub async fn close_if_abandoned(&self, ttl: Duration) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.players.is_empty() {
            return false;
        }
        if !inner.closed && inner.created_at.elapsed() >= ttl {
            inner.closed = true;
        }
        inner.closed
    }

    // -----------------------------------------------------------------------
    // Game state
    // -----------------------------------------------------------------------

    /// Flips `started` to `true`. Returns `true` only for the call that
    /// made the transition.
    pub async fn start_game(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.started {
            return false;
        }
        inner.started = true;
        tracing::info!(room_id = %self.id, players = inner.players.len(), "game started");
        true
    }

    pub async fn is_started(&self) -> bool {
        self.inner.lock().await.started
    }

    fn question(&self, index: i64) -> Result<(usize, &Question), RoomError> {
        let out_of_range = || RoomError::QuestionIndexOutOfRange {
            index,
            count: self.questions.len(),
        };
        let position = usize::try_from(index).map_err(|_| out_of_range())?;
        let question = self.questions.get(position).ok_or_else(out_of_range)?;
        Ok((position, question))
    }

    /// Looks up the question at `index` for a player and moves the
    /// player's cursor to it.
    pub async fn serve_question(
        &self,
        player_id: PlayerId,
        index: i64,
    ) -> Result<Question, RoomError> {
        let (position, question) = self.question(index)?;

        let mut inner = self.inner.lock().await;
        let session = inner
            .players
            .get_mut(&player_id)
            .ok_or(RoomError::PlayerNotFound(player_id))?;
        session.cursor = Some(position);
        Ok(question.clone())
    }

    /// Compares a submitted answer with the stored one, byte for byte, so
    /// a correct result always echoes `chosen_answer == correct_answer`.
    /// Does not touch the score.
    pub async fn check_answer(
        &self,
        player_id: PlayerId,
        index: i64,
        answer: &str,
    ) -> Result<AnswerCheck, RoomError> {
        let (_, question) = self.question(index)?;
        let is_correct = answer == question.answer;

        let mut inner = self.inner.lock().await;
        let session = inner
            .players
            .get_mut(&player_id)
            .ok_or(RoomError::PlayerNotFound(player_id))?;
        session.answered += 1;
        if is_correct {
            session.correct += 1;
        }

        Ok(AnswerCheck {
            correct_answer: question.answer.clone(),
            chosen_answer: answer.to_owned(),
            is_correct,
        })
    }

    /// Adds one point and returns the player's new standing.
    pub async fn award_point(&self, player_id: PlayerId) -> Result<PlayerSummary, RoomError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .players
            .get_mut(&player_id)
            .ok_or(RoomError::PlayerNotFound(player_id))?;
        session.score = session.score.saturating_add(1);
        Ok(session.summary())
    }

    /// Overwrites a player's score with a client-reported value.
    pub async fn set_score(
        &self,
        player_id: PlayerId,
        score: u32,
    ) -> Result<PlayerSummary, RoomError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .players
            .get_mut(&player_id)
            .ok_or(RoomError::PlayerNotFound(player_id))?;
        session.score = score;
        Ok(session.summary())
    }

    /// Snapshot for the HTTP API.
    pub async fn summary(&self) -> RoomSummary {
        let inner = self.inner.lock().await;
        RoomSummary {
            code: self.id.clone(),
            host: self.host.clone(),
            players: inner.players.values().map(|p| p.score_row()).collect(),
            time_limit: self.time_limit_minutes,
            num_questions: self.questions.len(),
            started: inner.started,
        }
    }

    /// Pre-check used by the HTTP join endpoint. Admission over the
    /// connection re-checks atomically in [`Room::join`].
    pub async fn can_admit(&self, username: &str) -> Result<(), RoomError> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(RoomError::NotFound(self.id.clone()));
        }
        if inner.players.len() >= self.max_players {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        if inner.players.values().any(|p| p.has_name(username)) {
            return Err(RoomError::UsernameTaken(username.to_owned()));
        }
        Ok(())
    }
}

impl<C: Connection> std::fmt::Debug for Room<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("questions", &self.questions.len())
            .field("max_players", &self.max_players)
            .finish_non_exhaustive()
    }
}
