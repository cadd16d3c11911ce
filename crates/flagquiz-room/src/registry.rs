//! Room registry: creates, looks up and removes rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use flagquiz_protocol::{RoomId, RoomSummary};
use flagquiz_transport::Connection;
use rand::Rng;
use tokio::sync::Mutex;

use crate::{RegistryConfig, Room, RoomConfig, RoomError};

/// The process-wide set of live rooms.
///
/// Created once at server start and shared by every handler through an
/// `Arc`. The registry lock guards only the code → room map: it is taken
/// for a lookup or an insert/remove and never held across a room lock or
/// any network I/O. Operations that need both (summaries, the abandoned
/// room sweep) collect `Arc<Room>`s first and work on them afterwards.
pub struct RoomRegistry<C: Connection> {
    rooms: Mutex<HashMap<RoomId, Arc<Room<C>>>>,
    config: RegistryConfig,
}

impl<C: Connection> RoomRegistry<C> {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates an empty room and returns its code.
    ///
    /// Codes are random, zero-padded to `code_digits`, and regenerated
    /// until they miss every live room.
    ///
    /// # Errors
    /// [`RoomError::CapacityExceeded`] when the registry is at its room
    /// limit.
    pub async fn create_room(&self, config: RoomConfig) -> Result<RoomId, RoomError> {
        let limit = self.config.room_limit();
        let mut rooms = self.rooms.lock().await;

        if rooms.len() >= limit {
            tracing::debug!(rooms = rooms.len(), limit, "room limit reached");
            return Err(RoomError::CapacityExceeded(limit));
        }

        let mut room_id = self.random_code();
        while rooms.contains_key(&room_id) {
            room_id = self.random_code();
        }

        let room = Room::new(room_id.clone(), config, self.config.max_players);
        tracing::info!(
            %room_id,
            host = %room.host(),
            questions = room.question_count(),
            "room created"
        );
        rooms.insert(room_id.clone(), Arc::new(room));
        Ok(room_id)
    }

    fn random_code(&self) -> RoomId {
        let digits = self.config.code_digits as usize;
        let n = rand::rng().random_range(0..self.config.code_space());
        RoomId::new(format!("{n:0digits$}"))
    }

    /// Looks up a room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room has this code.
    pub async fn get_room(&self, room_id: &RoomId) -> Result<Arc<Room<C>>, RoomError> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Removes a room by code. Removing a missing room is a no-op.
    pub async fn remove_room(&self, room_id: &RoomId) -> bool {
        let removed = self.rooms.lock().await.remove(room_id).is_some();
        if removed {
            tracing::info!(%room_id, "room removed");
        }
        removed
    }

    /// Removes `room` only if the registry still maps its code to this
    /// exact instance. A handler finishing late can therefore never remove
    /// a newer room that happens to reuse the code.
    pub async fn release(&self, room: &Arc<Room<C>>) -> bool {
        let mut rooms = self.rooms.lock().await;
        let same = rooms
            .get(room.id())
            .is_some_and(|current| Arc::ptr_eq(current, room));
        if same {
            rooms.remove(room.id());
            tracing::info!(room_id = %room.id(), "room closed and removed");
        }
        same
    }

    /// Closes and removes rooms that nobody joined within `ttl`, plus any
    /// closed room still registered. Returns the removed codes.
    pub async fn sweep_abandoned(&self, ttl: Duration) -> Vec<RoomId> {
        let snapshot = self.snapshot().await;

        let mut dead = Vec::new();
        for room in snapshot {
            if room.close_if_abandoned(ttl).await {
                dead.push(room);
            }
        }

        let mut removed = Vec::new();
        for room in dead {
            if self.release(&room).await {
                tracing::info!(room_id = %room.id(), "abandoned room swept");
                removed.push(room.id().clone());
            }
        }
        removed
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Summaries of every live room, ordered by code.
    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for room in self.snapshot().await {
            summaries.push(room.summary().await);
        }
        summaries.sort_by(|a, b| a.code.as_str().cmp(b.code.as_str()));
        summaries
    }

    async fn snapshot(&self) -> Vec<Arc<Room<C>>> {
        self.rooms.lock().await.values().cloned().collect()
    }
}

impl<C: Connection> Default for RoomRegistry<C> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
