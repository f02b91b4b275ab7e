//! # Diceforge
//!
//! Realtime multiplayer dice game server: an HTTP + WebSocket edge
//! router in front of a `GameRoom` actor per room code and one
//! server-wide `GlobalLobby` actor.
//!
//! ```text
//! diceforge-transport  ← pumps a single WebSocket (this crate wires it up)
//!         ↕
//! diceforge-room / diceforge-lobby  ← actor state machines
//!         ↕
//! diceforge-session  ← auth, connection sessions
//!         ↕
//! diceforge-protocol  ← wire types
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod sinks;

pub use config::Config;
pub use error::DiceforgeError;
pub use server::{build_router, AppState, PROTOCOL_VERSION};
pub use sinks::{LobbySinkForRoom, RoomSinkForLobby};

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::DiceforgeError;
    pub use crate::server::{build_router, AppState, PROTOCOL_VERSION};
}
