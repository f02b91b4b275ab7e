//! `GlobalLobby` actor: presence, the public room directory, lobby
//! chat, and join-request routing.
//!
//! There is exactly one `GlobalLobby` per server process. It has no
//! dependency on `diceforge-room` — its only address to a room is the
//! [`room_sink::RoomSink`] trait, injected by whichever binary wires the
//! two actors together.

mod error;
mod lobby;
mod model;
mod room_sink;
mod storage;

pub use error::LobbyError;
pub use lobby::{spawn, spawn_restoring, LobbyHandle, OutboundSender};
pub use model::{LobbyState, PendingJoinRequest};
pub use room_sink::{NullRoomSink, RoomSink};
pub use storage::{LobbyStorage, MemoryStorage};
