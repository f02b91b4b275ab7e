//! Durable storage for the `GlobalLobby` singleton actor.
//!
//! Two keys, mirroring the room layer's split: `lobby_state` (directory,
//! chat, pending join requests) and `session_index` (who's connected).
//! See `diceforge_room::storage` for why `MemoryStorage` — the process
//! itself as the durability boundary — is the only implementation this
//! server ships.

use diceforge_session::SessionIndexEntry;
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::model::LobbyState;

pub trait LobbyStorage: Send + Sync + 'static {
    fn load_lobby_state(&self) -> BoxFuture<'_, Option<LobbyState>>;
    fn save_lobby_state(&self, state: LobbyState) -> BoxFuture<'_, ()>;

    fn load_session_index(&self) -> BoxFuture<'_, Vec<SessionIndexEntry>>;
    fn save_session_index(&self, entries: Vec<SessionIndexEntry>) -> BoxFuture<'_, ()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    lobby_state: RwLock<Option<LobbyState>>,
    session_index: RwLock<Vec<SessionIndexEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LobbyStorage for MemoryStorage {
    fn load_lobby_state(&self) -> BoxFuture<'_, Option<LobbyState>> {
        Box::pin(async move { self.lobby_state.read().await.clone() })
    }

    fn save_lobby_state(&self, state: LobbyState) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            *self.lobby_state.write().await = Some(state);
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrips_lobby_state() {
        let storage = MemoryStorage::new();
        assert!(storage.load_lobby_state().await.is_none());
        storage.save_lobby_state(LobbyState::new()).await;
        assert!(storage.load_lobby_state().await.is_some());
    }
}
