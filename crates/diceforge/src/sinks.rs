//! Adapters that let the room and lobby actors address each other
//! without depending on each other's crate.
//!
//! `diceforge-room` only knows `diceforge_room::LobbySink`;
//! `diceforge-lobby` only knows `diceforge_lobby::RoomSink`. This binary
//! is the one place that depends on both crates, so it's the one place
//! that can implement each side's trait over the other's concrete
//! handle.

use std::sync::{Arc, OnceLock};

use diceforge_lobby::{LobbyHandle, RoomSink};
use diceforge_protocol::{JoinRequestId, RoomCode, RoomSummary, UserId};
use diceforge_room::{LobbySink, RoomManager};
use futures_util::future::BoxFuture;

/// The lobby's address for a room, backed by the live [`RoomManager`].
///
/// `GlobalLobby` and `RoomManager` are constructed from each other's
/// handle, so neither can exist before the other. This sink is built
/// empty and filled in with [`set`](Self::set) once the manager it
/// wraps is actually constructed — by the time the lobby ever calls a
/// trait method, startup has long finished and the cell is populated.
pub struct RoomSinkForLobby {
    manager: OnceLock<RoomManager>,
}

impl RoomSinkForLobby {
    pub fn new() -> Self {
        Self { manager: OnceLock::new() }
    }

    /// Completes the wiring once the `RoomManager` exists. Must be
    /// called before the server starts accepting connections.
    pub fn set(&self, manager: RoomManager) {
        let _ = self.manager.set(manager);
    }
}

impl Default for RoomSinkForLobby {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomSink for RoomSinkForLobby {
    fn submit_join_request(
        &self,
        room_code: RoomCode,
        requester: UserId,
        display_name: String,
        avatar_seed: String,
    ) -> BoxFuture<'static, Result<JoinRequestId, String>> {
        let manager = self.manager.get().cloned();
        Box::pin(async move {
            let Some(manager) = manager else {
                return Err("room manager not yet initialized".to_string());
            };
            let Some(room) = manager.get(&room_code).await else {
                return Err("room not found".to_string());
            };
            room.submit_join_request(requester, display_name, avatar_seed)
                .await
                .map(|view| view.id)
                .map_err(|err| err.to_string())
        })
    }

    fn cancel_join_request(&self, room_code: RoomCode, requester: UserId) -> BoxFuture<'static, ()> {
        let manager = self.manager.get().cloned();
        Box::pin(async move {
            let Some(manager) = manager else { return };
            if let Some(room) = manager.get(&room_code).await {
                room.cancel_join_request(requester).await;
            }
        })
    }
}

/// The room's address for the lobby, backed by the live [`LobbyHandle`].
pub struct LobbySinkForRoom {
    lobby: LobbyHandle,
}

impl LobbySinkForRoom {
    pub fn new(lobby: LobbyHandle) -> Self {
        Self { lobby }
    }
}

impl LobbySink for LobbySinkForRoom {
    fn upsert_room_summary(&self, summary: RoomSummary) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby
                .apply_directory_update(diceforge_protocol::RoomDirectoryUpdate::Upsert(summary))
                .await;
        })
    }

    fn remove_room_summary(&self, code: RoomCode) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby
                .apply_directory_update(diceforge_protocol::RoomDirectoryUpdate::Remove(code))
                .await;
        })
    }

    fn deliver_join_approved(&self, user_id: UserId, code: RoomCode) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby.deliver_join_approved(user_id, code).await;
        })
    }

    fn deliver_join_declined(&self, user_id: UserId, code: RoomCode) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby.deliver_join_declined(user_id, code).await;
        })
    }

    fn release_join_slot(&self, _user_id: UserId, request_id: JoinRequestId) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby.release_join_slot(request_id).await;
        })
    }

    fn publish_highlight(&self, code: RoomCode, text: String) -> BoxFuture<'static, ()> {
        let lobby = self.lobby.clone();
        Box::pin(async move {
            lobby.publish_highlight(code, text).await;
        })
    }
}
