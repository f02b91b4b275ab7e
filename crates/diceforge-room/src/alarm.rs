//! The room's alarm obligations.
//!
//! `GameRoom` has exactly one [`diceforge_tick::AlarmScheduler`] and
//! reschedules it every time one of these obligations changes. The
//! distilled spec enumerates four kinds (`afk_warning`, `afk_timeout`,
//! `room_cleanup`, `game_start`); a join request's 120-second TTL is the
//! same kind of wall-clock obligation and shares the same scheduler
//! rather than getting a timer of its own, so `JoinRequestExpiry` is
//! added here to keep "exactly one alarm pending" true even with
//! multiple join requests outstanding.

use diceforge_protocol::JoinRequestId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmKind {
    AfkWarning,
    AfkTimeout,
    RoomCleanup,
    GameStart,
    JoinRequestExpiry(JoinRequestId),
    /// The host disconnected; if they haven't reconnected by the time
    /// this fires, ownership transfers to the earliest-joined remaining
    /// player.
    HostGraceExpiry,
}

pub type RoomAlarm = diceforge_tick::AlarmScheduler<AlarmKind>;
pub type RoomAlarmRecord = diceforge_tick::AlarmRecord<AlarmKind>;
