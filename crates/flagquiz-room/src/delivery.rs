//! Broadcast and unicast delivery.
//!
//! Both primitives hold the room lock for the whole send, so a player
//! cannot join or leave halfway through a broadcast, and two broadcasts
//! from different handlers reach every player in the same order.
//!
//! A failed send is never retried. The failing player's connection is
//! closed and its session evicted; its handler will see the closed
//! connection on its next `recv` and run its normal termination path.

use flagquiz_protocol::PlayerId;
use flagquiz_transport::Connection;

use crate::room::RoomInner;
use crate::{Room, RoomError};

/// What happened during one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of players the message reached.
    pub delivered: usize,
    /// Players whose send failed and who were removed.
    pub evicted: Vec<PlayerId>,
}

impl<C: Connection> Room<C> {
    /// Sends `payload` to every player in the room.
    ///
    /// Partial delivery is normal: players whose connection fails are
    /// evicted and listed in the report, and everyone else still gets the
    /// message.
    pub async fn broadcast(&self, payload: &[u8]) -> BroadcastReport {
        let mut inner = self.inner.lock().await;
        let mut report = BroadcastReport::default();

        for (player_id, session) in &inner.players {
            match session.connection.send(payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        room_id = %self.id(),
                        %player_id,
                        error = %e,
                        "broadcast failed, evicting player"
                    );
                    report.evicted.push(*player_id);
                }
            }
        }

        for player_id in &report.evicted {
            evict(&mut inner, *player_id).await;
        }
        if !report.evicted.is_empty() && inner.players.is_empty() {
            inner.closed = true;
        }

        report
    }

    /// Sends `payload` to one player.
    ///
    /// # Errors
    /// - [`RoomError::PlayerNotFound`] if the player is not in the room.
    /// - [`RoomError::DeliveryFailed`] if the send failed. The player has
    ///   been evicted by the time this returns.
    pub async fn unicast(&self, player_id: PlayerId, payload: &[u8]) -> Result<(), RoomError> {
        let mut inner = self.inner.lock().await;

        let session = inner
            .players
            .get(&player_id)
            .ok_or(RoomError::PlayerNotFound(player_id))?;

        let sent = session.connection.send(payload).await;
        if let Err(e) = sent {
            tracing::warn!(
                room_id = %self.id(),
                %player_id,
                error = %e,
                "unicast failed, evicting player"
            );
            let reason = e.to_string();
            evict(&mut inner, player_id).await;
            if inner.players.is_empty() {
                inner.closed = true;
            }
            return Err(RoomError::DeliveryFailed(player_id, reason));
        }
        Ok(())
    }
}

/// Removes a player and closes its connection. Caller holds the lock.
async fn evict<C: Connection>(inner: &mut RoomInner<C>, player_id: PlayerId) {
    if let Some(session) = inner.players.remove(&player_id) {
        if let Err(e) = session.connection.close().await {
            tracing::debug!(%player_id, error = %e, "close after failed send");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use flagquiz_protocol::RoomId;
    use flagquiz_transport::MemoryConnection;

    use super::*;
    use crate::RoomConfig;

    fn room() -> Room<MemoryConnection> {
        Room::new(RoomId::new("0042"), RoomConfig::new("host", 3, Vec::new()), 9)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let room = room();
        let (a, mut pa) = MemoryConnection::pair();
        let (b, mut pb) = MemoryConnection::pair();
        room.join(Arc::new(a), "alice").await.unwrap();
        room.join(Arc::new(b), "bob1").await.unwrap();

        let report = room.broadcast(b"hi").await;
        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());
        assert_eq!(pa.recv().await, Some(b"hi".to_vec()));
        assert_eq!(pb.recv().await, Some(b"hi".to_vec()));
    }

    #[tokio::test]
    async fn test_broadcast_evicts_failed_player_only() {
        let room = room();
        let (a, mut pa) = MemoryConnection::pair();
        let (b, mut pb) = MemoryConnection::pair();
        room.join(Arc::new(a), "alice").await.unwrap();
        let bob = room.join(Arc::new(b), "bob1").await.unwrap();

        pb.stop_reading();
        let report = room.broadcast(b"hi").await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, vec![bob.id]);
        assert_eq!(pa.recv().await, Some(b"hi".to_vec()));
        assert!(pb.is_closed());
        assert_eq!(room.player_count().await, 1);
        assert!(!room.is_closed().await);
    }

    #[tokio::test]
    async fn test_broadcast_evicting_everyone_closes_room() {
        let room = room();
        let (a, mut pa) = MemoryConnection::pair();
        room.join(Arc::new(a), "alice").await.unwrap();

        pa.stop_reading();
        let report = room.broadcast(b"hi").await;
        assert_eq!(report.delivered, 0);
        assert!(room.is_closed().await);
    }

    #[tokio::test]
    async fn test_unicast_targets_one_player() {
        let room = room();
        let (a, mut pa) = MemoryConnection::pair();
        let (b, mut pb) = MemoryConnection::pair();
        let alice = room.join(Arc::new(a), "alice").await.unwrap();
        room.join(Arc::new(b), "bob1").await.unwrap();

        room.unicast(alice.id, b"secret").await.unwrap();
        assert_eq!(pa.recv().await, Some(b"secret".to_vec()));
        assert_eq!(pb.try_recv(), None);
    }

    #[tokio::test]
    async fn test_unicast_unknown_player() {
        let room = room();
        let err = room.unicast(PlayerId(5), b"x").await.unwrap_err();
        assert!(matches!(err, RoomError::PlayerNotFound(PlayerId(5))));
    }

    #[tokio::test]
    async fn test_unicast_failure_evicts() {
        let room = room();
        let (a, mut pa) = MemoryConnection::pair();
        let alice = room.join(Arc::new(a), "alice").await.unwrap();

        pa.stop_reading();
        let err = room.unicast(alice.id, b"x").await.unwrap_err();
        assert!(matches!(err, RoomError::DeliveryFailed(id, _) if id == alice.id));
        assert_eq!(room.player_count().await, 0);
        assert!(pa.is_closed());
    }
}
