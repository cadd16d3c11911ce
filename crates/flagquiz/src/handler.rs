//! Per-connection handler: handshake, admission, then the in-room event loop.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   0. Complete the WebSocket upgrade, bounded by the admission timeout
//!   1. Receive the admission message `{username, roomId}` → validate
//!   2. Join the room → broadcast `playerJoined`
//!   3. Loop: receive `{event, data}` frames → dispatch
//!   4. On `leave`, disconnect or eviction: leave the room, broadcast
//!      `playerLeft`, and drop the room from the registry if it emptied
//!
//! Admission failures are terminal: the client gets one error message and
//! the connection is closed, with nothing broadcast. Errors during the
//! session go to the requesting player only and the session continues.

use std::sync::Arc;

use flagquiz_protocol::{
    Admission, ClientEvent, Codec, ErrorKind, ErrorMessage, JsonCodec, PlayerSummary,
    ProtocolError, RawEvent, ServedQuestion, ServerEvent,
};
use flagquiz_room::{Room, RoomError, RoomRegistry};
use flagquiz_transport::{Connection, PendingConnection, TransportError};

use crate::{FlagQuizError, GameSettings, ScoringMode};

/// Allowed username length, in characters, after trimming.
pub(crate) const USERNAME_LEN: std::ops::RangeInclusive<usize> = 4..=10;

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<C: Connection> {
    pub(crate) registry: Arc<RoomRegistry<C>>,
    pub(crate) codec: JsonCodec,
    pub(crate) settings: GameSettings,
}

/// Checks a display name and returns it trimmed.
pub(crate) fn validate_username(username: &str) -> Result<&str, ProtocolError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();
    if USERNAME_LEN.contains(&len) {
        Ok(trimmed)
    } else {
        Err(ProtocolError::InvalidMessage(format!(
            "username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )))
    }
}

/// Upgrades an accepted socket, then hands it to [`handle_connection`].
///
/// The upgrade and the admission message are each bounded by
/// `admission_timeout`.
pub(crate) async fn handle_incoming<P>(
    pending: P,
    state: Arc<ServerState<P::Connection>>,
) -> Result<(), FlagQuizError>
where
    P: PendingConnection,
    P::Error: Into<FlagQuizError>,
{
    let addr = pending.peer_addr();
    let timeout = state.settings.admission_timeout;
    let conn = match tokio::time::timeout(timeout, pending.upgrade()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            tracing::debug!(%addr, "handshake timed out");
            return Err(TransportError::HandshakeTimeout(timeout).into());
        }
    };
    handle_connection(conn, state).await
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    state: Arc<ServerState<C>>,
) -> Result<(), FlagQuizError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Admission ---
    let (room, me) = match admit(&conn, &state).await {
        Ok(Some(admitted)) => admitted,
        Ok(None) => {
            tracing::debug!(%conn_id, "connection closed before admission");
            let _ = conn.close().await;
            return Ok(());
        }
        Err(e) => {
            let kind = match &e {
                FlagQuizError::Room(room_err) => room_err.kind(),
                _ => ErrorKind::MalformedMessage,
            };
            tracing::debug!(%conn_id, error = %e, "admission rejected");
            send_direct(&*conn, &state.codec, &ErrorMessage::new(kind, e.to_string())).await;
            let _ = conn.close().await;
            return Err(e);
        }
    };

    // --- Step 2: Active ---
    let session = Session {
        conn: &conn,
        state: &state,
        room: &room,
        me: &me,
    };
    let exit = session.run().await;

    // --- Step 3: Terminate ---
    session.terminate(exit).await;
    Ok(())
}

/// Reads and applies the admission message.
///
/// Returns `Ok(None)` if the client went away before sending anything.
async fn admit<C: Connection>(
    conn: &Arc<C>,
    state: &ServerState<C>,
) -> Result<Option<(Arc<Room<C>>, PlayerSummary)>, FlagQuizError> {
    let data = match tokio::time::timeout(state.settings.admission_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => return Ok(None),
        Ok(Err(e)) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "recv failed before admission");
            return Ok(None);
        }
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("admission timed out".into()).into());
        }
    };

    let admission: Admission = state.codec.decode(&data)?;
    let username = validate_username(&admission.username)?;

    let room = state.registry.get_room(&admission.room_id).await?;
    let me = room.join(Arc::clone(conn), username).await?;
    Ok(Some((room, me)))
}

/// Sends a value straight to the connection, outside any room.
async fn send_direct<C: Connection, T: serde::Serialize>(conn: &C, codec: &JsonCodec, value: &T) {
    match codec.encode(value) {
        Ok(bytes) => {
            if let Err(e) = conn.send(&bytes).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "failed to send to connection");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to encode message"),
    }
}

// ---------------------------------------------------------------------------
// Active session
// ---------------------------------------------------------------------------

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// The client sent `leave`.
    Left,
    /// The connection closed or failed to read.
    Disconnected,
    /// A send to this player failed and the room evicted it.
    Evicted,
}

/// Marker: this player is no longer in the room.
#[derive(Debug)]
struct Evicted;

/// What to do after an event.
enum Flow {
    Continue,
    Leave,
}

/// One admitted player's view of its room.
struct Session<'a, C: Connection> {
    conn: &'a Arc<C>,
    state: &'a ServerState<C>,
    room: &'a Arc<Room<C>>,
    me: &'a PlayerSummary,
}

impl<C: Connection> Session<'_, C> {
    async fn run(&self) -> Exit {
        if self.broadcast(&ServerEvent::PlayerJoined(self.me.clone())).await.is_err() {
            return Exit::Evicted;
        }

        loop {
            let data = match self.conn.recv().await {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::debug!(player_id = %self.me.id, "connection closed");
                    return Exit::Disconnected;
                }
                Err(e) => {
                    tracing::debug!(player_id = %self.me.id, error = %e, "recv error");
                    return Exit::Disconnected;
                }
            };

            let raw: RawEvent = match self.state.codec.decode(&data) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(player_id = %self.me.id, error = %e, "skipping malformed frame");
                    continue;
                }
            };

            let tag = raw.event.clone();
            let event = match ClientEvent::from_raw(raw) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tracing::debug!(player_id = %self.me.id, event = %tag, "ignoring unknown event");
                    continue;
                }
                Err(e) => {
                    let reply = format!("invalid {tag} payload: {e}");
                    if self.reply_error(ErrorKind::MalformedMessage, reply).await.is_err() {
                        return Exit::Evicted;
                    }
                    continue;
                }
            };

            tracing::debug!(player_id = %self.me.id, event = event.name(), "event received");
            match self.dispatch(event).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Leave) => return Exit::Left,
                Err(Evicted) => return Exit::Evicted,
            }
        }
    }

    async fn dispatch(&self, event: ClientEvent) -> Result<Flow, Evicted> {
        match event {
            ClientEvent::Leave => return Ok(Flow::Leave),
            ClientEvent::LoadGame => self.load_game().await?,
            ClientEvent::GetNewQuestion(request) => {
                match self.room.serve_question(self.me.id, request.index).await {
                    Ok(question) => {
                        let index = usize::try_from(request.index).unwrap_or_default();
                        self.reply(&ServerEvent::NewQuestion(ServedQuestion { index, question }))
                            .await?;
                    }
                    Err(e) => self.report(e).await?,
                }
            }
            ClientEvent::ValidateAnswer(submission) => {
                let check = match self
                    .room
                    .check_answer(self.me.id, submission.question, &submission.answer)
                    .await
                {
                    Ok(check) => check,
                    Err(e) => {
                        self.report(e).await?;
                        return Ok(Flow::Continue);
                    }
                };
                let is_correct = check.is_correct;
                self.reply(&ServerEvent::AnswerResult {
                    correct_answer: check.correct_answer,
                    chosen_answer: check.chosen_answer,
                })
                .await?;

                if is_correct && self.state.settings.scoring == ScoringMode::ServerAuthoritative {
                    match self.room.award_point(self.me.id).await {
                        Ok(standing) => self.broadcast(&ServerEvent::ScoreUpdated(standing)).await?,
                        Err(e) => self.report(e).await?,
                    }
                }
            }
            ClientEvent::UpdateScore(report) => {
                if self.state.settings.scoring != ScoringMode::ClientReported {
                    tracing::debug!(player_id = %self.me.id, "ignoring client-reported score");
                    return Ok(Flow::Continue);
                }
                match self.room.set_score(self.me.id, report.score).await {
                    Ok(standing) => self.broadcast(&ServerEvent::ScoreUpdated(standing)).await?,
                    Err(e) => self.report(e).await?,
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Countdown, then start. The room lock is taken per broadcast and
    /// never held across the pauses.
    async fn load_game(&self) -> Result<(), Evicted> {
        if self.room.is_started().await {
            tracing::debug!(room_id = %self.room.id(), "game already started, ignoring loadgame");
            return Ok(());
        }

        let settings = &self.state.settings;
        for n in (0..=settings.countdown_from).rev() {
            self.broadcast(&ServerEvent::Countdown(n)).await?;
            tokio::time::sleep(settings.countdown_step).await;
        }

        // Two players may count down at once; only the one that flips the
        // flag announces the start.
        if self.room.start_game().await {
            self.broadcast(&ServerEvent::GameStarted).await?;
        }
        Ok(())
    }

    async fn terminate(&self, exit: Exit) {
        let departure = self.room.leave(self.me.id).await;
        tracing::info!(
            room_id = %self.room.id(),
            player_id = %self.me.id,
            username = %self.me.username,
            ?exit,
            remaining = departure.remaining,
            "player session ended"
        );

        if departure.room_emptied() {
            self.state.registry.release(self.room).await;
        } else {
            let left = ServerEvent::PlayerLeft {
                username: self.me.username.clone(),
                id: self.me.id,
            };
            if let Some(bytes) = self.encode(&left) {
                let report = self.room.broadcast(&bytes).await;
                if report.delivered == 0 {
                    // The broadcast evicted whoever was left.
                    self.state.registry.release(self.room).await;
                }
            }
        }

        let _ = self.conn.close().await;
    }

    // -----------------------------------------------------------------------
    // Delivery helpers
    // -----------------------------------------------------------------------

    fn encode<T: serde::Serialize>(&self, value: &T) -> Option<Vec<u8>> {
        match self.state.codec.encode(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode message");
                None
            }
        }
    }

    /// Sends to this player only.
    async fn reply<T: serde::Serialize>(&self, value: &T) -> Result<(), Evicted> {
        let Some(bytes) = self.encode(value) else {
            return Ok(());
        };
        match self.room.unicast(self.me.id, &bytes).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(player_id = %self.me.id, error = %e, "reply failed");
                Err(Evicted)
            }
        }
    }

    async fn reply_error(&self, kind: ErrorKind, message: String) -> Result<(), Evicted> {
        self.reply(&ErrorMessage::new(kind, message)).await
    }

    /// Reports a room error to this player. A missing player means the
    /// room already evicted us.
    async fn report(&self, err: RoomError) -> Result<(), Evicted> {
        match err {
            RoomError::PlayerNotFound(_) | RoomError::DeliveryFailed(..) => Err(Evicted),
            other => self.reply_error(other.kind(), other.to_string()).await,
        }
    }

    /// Sends to everyone in the room. Fails only if this player was among
    /// the evicted.
    async fn broadcast(&self, event: &ServerEvent) -> Result<(), Evicted> {
        let Some(bytes) = self.encode(event) else {
            return Ok(());
        };
        let report = self.room.broadcast(&bytes).await;
        if report.evicted.contains(&self.me.id) {
            return Err(Evicted);
        }
        Ok(())
    }
}
