//! `GameRoom` actor: the per-room dice game state machine, turn timers,
//! and room chat.
//!
//! Each room code runs as its own Tokio task (actor model), created
//! lazily on first contact by [`manager::RoomManager`]. `diceforge-room`
//! has no dependency on `diceforge-lobby` — its only address to the
//! lobby is the [`lobby_sink::LobbySink`] trait, injected by whichever
//! binary wires the two actors together.

mod alarm;
mod config;
mod error;
mod lobby_sink;
mod manager;
mod model;
mod rng;
mod room;
mod scoring;
mod storage;

pub use alarm::{AlarmKind, RoomAlarm, RoomAlarmRecord};
pub use config::RoomConfig;
pub use error::RoomError;
pub use lobby_sink::{LobbySink, NullLobbySink};
pub use manager::{RoomManager, StorageFactory};
pub use model::{
    JoinRequest, JoinRequestStatus, Phase, PlayerState, PlayerType, RoomSettings, RoomState,
};
pub use room::{spawn, spawn_restoring, OutboundSender, RoomHandle};
pub use scoring::{ScoringRules, StandardScoring, YAHTZEE_BONUS};
pub use storage::{MemoryStorage, RoomStorage};
