//! Network Module
//!
//! Authoritative multiplayer layer: one [`room::GameRoom`] per match, a
//! registry with idle reaping, and a thin WebSocket transport.

pub mod protocol;
pub mod room;
pub mod server;

pub use protocol::{ClientMessage, RosterEntry, ServerMessage, SessionId, SessionOptions};
pub use room::{GameRoom, RoomConfig, RoomError, RoomId, RoomManager, RoomState};
pub use server::{GameServer, GameServerError, ServerConfig};
