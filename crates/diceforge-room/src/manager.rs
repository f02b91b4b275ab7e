//! Keeps one [`RoomHandle`] per live `RoomCode` and creates rooms lazily
//! on first contact, matching the "a room is created by the act of
//! someone opening its WebSocket" model in the distilled spec — there is
//! no explicit `CREATE_ROOM` call.

use std::collections::HashMap;
use std::sync::Arc;

use diceforge_protocol::RoomCode;
use tokio::sync::Mutex;

use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::lobby_sink::LobbySink;
use crate::room::{self, RoomHandle};
use crate::scoring::ScoringRules;
use crate::storage::RoomStorage;

/// Produces a fresh [`RoomStorage`] for a room code the manager hasn't
/// seen before. The binary crate supplies this — in this server it's
/// always `MemoryStorage::new`, but keeping it behind a factory means
/// swapping storage backends never touches the manager's routing logic.
pub type StorageFactory = Arc<dyn Fn() -> Arc<dyn RoomStorage> + Send + Sync>;

#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<Mutex<HashMap<RoomCode, RoomHandle>>>,
    config: RoomConfig,
    storage_factory: StorageFactory,
    lobby: Arc<dyn LobbySink>,
    scoring: Arc<dyn ScoringRules>,
}

impl RoomManager {
    pub fn new(
        config: RoomConfig,
        storage_factory: StorageFactory,
        lobby: Arc<dyn LobbySink>,
        scoring: Arc<dyn ScoringRules>,
    ) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config,
            storage_factory,
            lobby,
            scoring,
        }
    }

    /// Returns the room's handle, spawning it on first contact. A fresh
    /// room also gets a reaper task that forgets its entry once the actor
    /// tears itself down after `room_cleanup` — callers never need to
    /// explicitly garbage-collect an abandoned room.
    ///
    /// `is_public` overrides `self.config.is_public` for this room only
    /// (e.g. a host opening a private game); it's ignored once the room
    /// already exists, since only the first opener decides visibility.
    pub async fn get_or_create(&self, code: RoomCode, is_public: Option<bool>) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(&code) {
            return handle.clone();
        }
        let storage = (self.storage_factory)();
        let handle = room::spawn(
            code.clone(),
            self.config.clone(),
            storage,
            self.lobby.clone(),
            self.scoring.clone(),
            is_public.unwrap_or(self.config.is_public),
        );
        rooms.insert(code.clone(), handle.clone());

        let reaper_rooms = self.rooms.clone();
        let reaper_handle = handle.clone();
        tokio::spawn(async move {
            reaper_handle.closed().await;
            reaper_rooms.lock().await.remove(&code);
        });

        handle
    }

    /// Looks up a room without creating one — used by endpoints that
    /// should 404 on a code nobody has opened yet (`/room/:code/info`).
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.lock().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &RoomCode) -> Result<(), RoomError> {
        let mut rooms = self.rooms.lock().await;
        let handle = rooms.remove(code).ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.shutdown().await;
        Ok(())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn codes(&self) -> Vec<RoomCode> {
        self.rooms.lock().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby_sink::NullLobbySink;
    use crate::scoring::StandardScoring;
    use crate::storage::MemoryStorage;

    fn manager() -> RoomManager {
        RoomManager::new(
            RoomConfig::default(),
            Arc::new(|| Arc::new(MemoryStorage::new()) as Arc<dyn RoomStorage>),
            Arc::new(NullLobbySink),
            Arc::new(StandardScoring),
        )
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_handle_for_same_code() {
        let mgr = manager();
        let code = RoomCode::parse("ABC123").unwrap();
        let a = mgr.get_or_create(code.clone(), None).await;
        let b = mgr.get_or_create(code.clone(), None).await;
        assert_eq!(a.code(), b.code());
        assert_eq!(mgr.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_returns_none_for_unseen_code() {
        let mgr = manager();
        let code = RoomCode::parse("ZZZ999").unwrap();
        assert!(mgr.get(&code).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_shuts_down_and_forgets_room() {
        let mgr = manager();
        let code = RoomCode::parse("AAA111").unwrap();
        mgr.get_or_create(code.clone(), None).await;
        mgr.remove(&code).await.unwrap();
        assert!(mgr.get(&code).await.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_honors_per_room_visibility_override() {
        let mgr = manager();
        let code = RoomCode::parse("PRV001").unwrap();
        let handle = mgr.get_or_create(code.clone(), Some(false)).await;
        let summary = handle.summary().await.unwrap();
        assert!(!summary.is_public);
    }
}
