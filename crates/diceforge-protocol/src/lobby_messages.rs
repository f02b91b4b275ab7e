//! Wire types for the GlobalLobby actor: presence, the room directory,
//! lobby chat, and join-request / invite routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::error::ErrorCode;
use crate::ids::{JoinRequestId, RoomCode, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: RoomCode,
    pub host_display_name: String,
    pub player_count: u8,
    pub max_players: u8,
    pub spectator_count: u32,
    pub is_public: bool,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub identity: RoomIdentity,
}

/// A palette/name pair derived deterministically from a room's code, so
/// every client renders the same room the same way without the server
/// having to persist or broadcast anything beyond the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomIdentity {
    pub palette: String,
    pub name: String,
}

const IDENTITY_PALETTES: &[&str] =
    &["crimson", "amber", "jade", "cobalt", "violet", "coral", "slate", "gold"];

const IDENTITY_NAMES: &[&str] = &[
    "Fox", "Otter", "Heron", "Lynx", "Wren", "Badger", "Falcon", "Mantis", "Raven", "Viper",
    "Orca", "Stag",
];

/// FNV-1a over the room code's bytes — stable across process restarts and
/// platforms, unlike `std::hash::DefaultHasher` (which is randomly seeded).
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Derives a room's `identity` from its code alone, per §3's "deterministic
/// palette/name derived from `code`" — same code always yields the same
/// identity, with no lookup table to keep in sync.
pub fn derive_room_identity(code: &RoomCode) -> RoomIdentity {
    let hash = fnv1a(code.as_str().as_bytes());
    let palette = IDENTITY_PALETTES[hash as usize % IDENTITY_PALETTES.len()];
    let name = IDENTITY_NAMES[(hash >> 32) as usize % IDENTITY_NAMES.len()];
    RoomIdentity {
        palette: palette.to_string(),
        name: name.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_seed: String,
}

/// Commands a connected socket may send into the `GlobalLobby`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyClientMessage {
    RequestJoin { room_code: RoomCode },
    CancelJoinRequest { request_id: JoinRequestId },
    Chat { content: String },
    TypingStart,
    TypingStop,
}

/// Events the `GlobalLobby` broadcasts or replies with.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyServerEvent {
    PresenceJoin { user: PresenceView },
    PresenceLeave { user_id: UserId },
    LobbyRoomsList { rooms: Vec<RoomSummary> },
    LobbyRoomUpdate { room: RoomSummary },
    LobbyRoomRemoved { code: RoomCode },
    LobbyChatHistory { messages: Vec<ChatMessage> },
    LobbyChatMessage { message: ChatMessage },
    TypingIndicator { user_id: UserId, is_typing: bool },
    InviteReceived { room_code: RoomCode, inviter_display_name: String },
    JoinRequestSent { request_id: JoinRequestId, room_code: RoomCode },
    JoinRequestCancelled { request_id: JoinRequestId },
    JoinApproved { room_code: RoomCode },
    JoinRequestDeclined { room_code: RoomCode },
    LobbyHighlight { room_code: RoomCode, text: String },
    Error { code: ErrorCode, message: String },
}

/// Internal RPC the `GameRoom` uses to keep the lobby's room directory in
/// sync; not a client-visible wire message, just the call shape between
/// the two actors.
#[derive(Debug, Clone)]
pub enum RoomDirectoryUpdate {
    Upsert(RoomSummary),
    Remove(RoomCode),
}
