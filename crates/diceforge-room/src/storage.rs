//! Durable storage for a single `GameRoom`.
//!
//! Three keys live in an actor's private namespace per §6 of the
//! distilled spec: `game_state`, `session_index`, and `alarm_data`.
//! [`RoomStorage`] is the trait boundary the actor writes through —
//! every mutation that's visible to clients is written here before the
//! corresponding broadcast goes out ("storage-first, broadcast-second").
//! [`MemoryStorage`] is the only implementation this server ships: the
//! process itself is the durability boundary (a hosting runtime that
//! evicts and recreates the actor is out of scope for a single-process
//! deployment), but keeping the trait means the room's command handling
//! never assumes a particular backing store.

use diceforge_session::SessionIndexEntry;
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::alarm::RoomAlarmRecord;
use crate::model::RoomState;

pub trait RoomStorage: Send + Sync + 'static {
    fn load_game_state(&self) -> BoxFuture<'_, Option<RoomState>>;
    fn save_game_state(&self, state: RoomState) -> BoxFuture<'_, ()>;

    fn load_session_index(&self) -> BoxFuture<'_, Vec<SessionIndexEntry>>;
    fn save_session_index(&self, entries: Vec<SessionIndexEntry>) -> BoxFuture<'_, ()>;

    fn load_alarm(&self) -> BoxFuture<'_, Option<RoomAlarmRecord>>;
    fn save_alarm(&self, record: Option<RoomAlarmRecord>) -> BoxFuture<'_, ()>;
}

/// An in-process, in-memory `RoomStorage`. Durable across the room
/// actor's own restarts within the same server process, not across a
/// process restart — see the module doc for why that's the right scope
/// here.
#[derive(Default)]
pub struct MemoryStorage {
    game_state: RwLock<Option<RoomState>>,
    session_index: RwLock<Vec<SessionIndexEntry>>,
    alarm: RwLock<Option<RoomAlarmRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStorage for MemoryStorage {
    fn load_game_state(&self) -> BoxFuture<'_, Option<RoomState>> {
        Box::pin(async move { self.game_state.read().await.clone() })
    }

    fn save_game_state(&self, state: RoomState) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            *self.game_state.write().await = Some(state);
        })
    }

    fn load_session_index(&self) -> BoxFuture<'_, Vec<SessionIndexEntry>> {
        Box::pin(async move { self.session_index.read().await.clone() })
    }

    fn save_session_index(&self, entries: Vec<SessionIndexEntry>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            *self.session_index.write().await = entries;
        })
    }

    fn load_alarm(&self) -> BoxFuture<'_, Option<RoomAlarmRecord>> {
        Box::pin(async move { self.alarm.read().await.clone() })
    }

    fn save_alarm(&self, record: Option<RoomAlarmRecord>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            *self.alarm.write().await = record;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diceforge_protocol::RoomCode;

    #[tokio::test]
    async fn test_memory_storage_roundtrips_game_state() {
        let storage = MemoryStorage::new();
        assert!(storage.load_game_state().await.is_none());

        let state = RoomState::new(
            RoomCode::parse("ABC123").unwrap(),
            crate::model::RoomSettings {
                max_players: 6,
                is_public: true,
                allow_spectators: false,
            },
            chrono::Utc::now(),
        );
        storage.save_game_state(state.clone()).await;
        let loaded = storage.load_game_state().await.expect("saved state");
        assert_eq!(loaded.code, state.code);
    }

    #[tokio::test]
    async fn test_memory_storage_alarm_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.load_alarm().await.is_none());
        let record = RoomAlarmRecord {
            kind: crate::alarm::AlarmKind::RoomCleanup,
            scheduled_at: chrono::Utc::now(),
        };
        storage.save_alarm(Some(record)).await;
        assert!(storage.load_alarm().await.is_some());
        storage.save_alarm(None).await;
        assert!(storage.load_alarm().await.is_none());
    }
}
