//! The `GlobalLobby`'s internal, persisted state.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use diceforge_protocol::{ChatMessage, JoinRequestId, RoomCode, RoomSummary, UserId};
use serde::{Deserialize, Serialize};

/// A join request the lobby forwarded to a room, kept around so the
/// lobby can enforce "at most one pending join request per user" and
/// route the eventual approval/decline back without the room needing to
/// know anything about lobby sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingJoinRequest {
    pub id: JoinRequestId,
    pub requester: UserId,
    pub room_code: RoomCode,
    pub created_at: DateTime<Utc>,
}

/// The lobby's full persisted state, as saved under the `lobby_state`
/// key — the singleton analogue of a `GameRoom`'s `game_state`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LobbyState {
    pub directory: HashMap<RoomCode, RoomSummary>,
    pub chat: VecDeque<ChatMessage>,
    pub pending_join_requests: HashMap<JoinRequestId, PendingJoinRequest>,
}

impl LobbyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The one pending request a user has outstanding, if any.
    pub fn pending_for_user(&self, user_id: &UserId) -> Option<&PendingJoinRequest> {
        self.pending_join_requests
            .values()
            .find(|r| &r.requester == user_id)
    }

    /// `LOBBY_ROOMS_LIST` per §4.3: only rooms with `isPublic = true`.
    /// Private rooms still live in `directory` (e.g. for a future
    /// direct-by-code lookup) but never appear in this projection.
    pub fn rooms_list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .directory
            .values()
            .filter(|r| r.is_public)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(code: &str, updated_secs_ago: i64) -> RoomSummary {
        let code = RoomCode::parse(code).unwrap();
        RoomSummary {
            identity: diceforge_protocol::derive_room_identity(&code),
            code,
            host_display_name: "Host".into(),
            player_count: 1,
            max_players: 6,
            spectator_count: 0,
            is_public: true,
            status: diceforge_protocol::RoomStatus::Waiting,
            created_at: Utc::now(),
            updated_at: Utc::now() - chrono::Duration::seconds(updated_secs_ago),
        }
    }

    #[test]
    fn test_rooms_list_sorts_most_recently_updated_first() {
        let mut state = LobbyState::new();
        let old = summary("AAA111", 100);
        let fresh = summary("BBB222", 1);
        state.directory.insert(old.code.clone(), old);
        state.directory.insert(fresh.code.clone(), fresh.clone());
        let list = state.rooms_list();
        assert_eq!(list[0].code, fresh.code);
    }

    #[test]
    fn test_rooms_list_excludes_private_rooms() {
        let mut state = LobbyState::new();
        let public = summary("AAA111", 10);
        let mut private = summary("BBB222", 5);
        private.is_public = false;
        state.directory.insert(public.code.clone(), public.clone());
        state.directory.insert(private.code.clone(), private);
        let list = state.rooms_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].code, public.code);
    }

    #[test]
    fn test_pending_for_user_finds_outstanding_request() {
        let mut state = LobbyState::new();
        let request = PendingJoinRequest {
            id: JoinRequestId::new(),
            requester: UserId::from("alice"),
            room_code: RoomCode::parse("ABC123").unwrap(),
            created_at: Utc::now(),
        };
        state.pending_join_requests.insert(request.id, request);
        assert!(state.pending_for_user(&UserId::from("alice")).is_some());
        assert!(state.pending_for_user(&UserId::from("bob")).is_none());
    }
}
