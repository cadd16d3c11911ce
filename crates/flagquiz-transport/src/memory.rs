//! In-process connection pair backed by unbounded channels.
//!
//! [`MemoryConnection`] is the server side and implements [`Connection`];
//! [`MemoryPeer`] plays the client. Dropping the peer behaves like the
//! remote end vanishing: the server's `recv` yields `None` and its sends
//! fail, which is exactly what the room's eviction path needs to see.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// Memory connections count down from the top of the id space so they
/// never collide with WebSocket ids in mixed logs.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(u64::MAX);

/// State shared by both ends of a pair.
struct Shared {
    closed: AtomicBool,
    notify: Notify,
}

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    shared: Arc<Shared>,
}

/// Client side of an in-memory connection.
pub struct MemoryPeer {
    to_server: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_server: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    shared: Arc<Shared>,
}

impl MemoryConnection {
    /// Creates a connected pair.
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        });
        let id = ConnectionId::new(NEXT_MEMORY_ID.fetch_sub(1, Ordering::Relaxed));

        let conn = MemoryConnection {
            id,
            outbound,
            inbound: Mutex::new(inbound),
            shared: Arc::clone(&shared),
        };
        let peer = MemoryPeer {
            to_server: Some(to_server),
            from_server: Some(from_server),
            shared,
        };
        (conn, peer)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(format!(
                "{} already closed",
                self.id
            )));
        }
        self.outbound
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed(format!("{} peer gone", self.id)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut inbound = self.inbound.lock().await;
        if self.shared.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        tokio::select! {
            msg = inbound.recv() => Ok(msg),
            _ = self.shared.notify.notified() => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.shared.closed.store(true, Ordering::Release);
        // `notify_one` stores a permit, so a reader that has not parked yet
        // still wakes up.
        self.shared.notify.notify_one();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryPeer {
    /// Sends a frame to the server. Returns `false` once the server side
    /// has been dropped or the peer has hung up its sending half.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> bool {
        match &self.to_server {
            Some(tx) => tx.send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Waits for the next frame from the server. `None` once the server
    /// dropped its end or this peer stopped reading.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        match &mut self.from_server {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Returns the next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_server.as_mut()?.try_recv().ok()
    }

    /// Stops reading: every later server send fails, as it would for a
    /// client whose socket died without a close handshake.
    pub fn stop_reading(&mut self) {
        self.from_server = None;
    }

    /// Closes the client's sending half: the server's `recv` yields `None`.
    pub fn hang_up(&mut self) {
        self.to_server = None;
    }

    /// Returns `true` once the server closed the connection.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
