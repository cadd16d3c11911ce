//! Room registry, player sessions and delivery for flagquiz.
//!
//! This is the concurrent core of the server. Many connection handlers run
//! at once, and all of them meet here:
//!
//! - [`RoomRegistry`] — the process-wide map from room code to [`Room`],
//!   behind one lock that is never held across network I/O.
//! - [`Room`] — one game session. Its own lock guards the player map and
//!   the started flag, and is held for the whole of a broadcast.
//! - Player sessions — one admitted client each: name, score, connection,
//!   question cursor.
//! - Delivery ([`Room::broadcast`], [`Room::unicast`]) — sends that evict
//!   any player whose connection fails.
//!
//! # Lock ordering
//!
//! The registry lock and a room lock are never held at the same time. A
//! room that becomes empty marks itself closed under its own lock; the
//! caller then releases the room lock and asks the registry to drop it.
//!
//! ```text
//! handler ──join/leave/broadcast──▶ Room (room lock)
//!    │
//!    └──────get/release──────────▶ RoomRegistry (registry lock)
//! ```

mod config;
mod delivery;
mod error;
mod player;
mod registry;
mod room;

pub use config::{RegistryConfig, RoomConfig};
pub use delivery::BroadcastReport;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{AnswerCheck, Departure, Room};
