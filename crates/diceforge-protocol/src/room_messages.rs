//! Wire types for the GameRoom actor: the room-scoped client→server
//! command catalog, the server→client event catalog, and the payload
//! structs they share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::chat::ChatMessage;
use crate::error::ErrorCode;
use crate::ids::{JoinRequestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Waiting,
    Starting,
    TurnRoll,
    TurnDecide,
    Scoring,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    Human,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorecardEntry {
    pub category: Category,
    pub value: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_seed: String,
    pub player_type: PlayerType,
    pub is_host: bool,
    pub is_connected: bool,
    pub last_active_at: DateTime<Utc>,
    pub scorecard: Vec<ScorecardEntry>,
    pub total_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_dice: Option<[u8; 5]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_mask: Option<[bool; 5]>,
    pub rolls_remaining: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfigView {
    pub max_players: u8,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateView {
    pub code: String,
    pub config: RoomConfigView,
    pub host_user_id: UserId,
    pub players: Vec<PlayerView>,
    pub spectator_count: u32,
    pub phase: Phase,
    pub turn_number: u32,
    pub round_number: u32,
    pub current_player_index: Option<usize>,
    pub player_order: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rankings: Option<Vec<RankingEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub user_id: UserId,
    pub rank: u32,
    pub total_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestView {
    pub id: JoinRequestId,
    pub requester_id: UserId,
    pub requester_display_name: String,
    pub requester_avatar_seed: String,
    pub expires_at: DateTime<Utc>,
}

/// Commands a connected socket may send into a `GameRoom`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomClientMessage {
    JoinRoom,
    LeaveRoom,
    StartGame,
    RollDice { kept_mask: [bool; 5] },
    KeepDice { indices: Vec<u8> },
    ScoreCategory { category: Category },
    Chat { content: String, shout: bool },
    React { message_id: String, emoji: String, add: bool },
    JoinRequestResponse { request_id: JoinRequestId, approve: bool },
    Rematch,
    TypingStart,
    TypingStop,
}

/// Events a `GameRoom` broadcasts or replies with.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomServerEvent {
    RoomState { room: RoomStateView },
    RoomUpdated { room: RoomStateView },
    DiceRolled { user_id: UserId, dice: [u8; 5], rolls_remaining: u8 },
    DiceKept { user_id: UserId, kept_mask: [bool; 5] },
    TurnStarted { user_id: UserId, turn_number: u32, round_number: u32 },
    CategoryScored { user_id: UserId, category: Category, value: u32 },
    GameStarting { starts_in_seconds: u8, player_order: Vec<UserId> },
    GameOver { rankings: Vec<RankingEntry> },
    ChatMessage { message: ChatMessage },
    ChatHistory { messages: Vec<ChatMessage> },
    ReactionUpdate { message_id: String, emoji: String, user_ids: Vec<UserId> },
    TypingIndicator { user_id: UserId, is_typing: bool },
    AfkWarning { user_id: UserId, timeout_in_seconds: u8 },
    HostChanged { new_host_user_id: UserId },
    JoinRequestReceived { request: JoinRequestView },
    JoinRequestResolved { request_id: JoinRequestId, approved: bool },
    Error { code: ErrorCode, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_roll_dice() {
        let json = serde_json::json!({
            "type": "ROLL_DICE",
            "payload": {"keptMask": [true, false, false, false, false]}
        });
        let msg: RoomClientMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(msg, RoomClientMessage::RollDice { kept_mask } if kept_mask[0]));
    }

    #[test]
    fn test_decode_score_category() {
        let json = serde_json::json!({
            "type": "SCORE_CATEGORY",
            "payload": {"category": "FULL_HOUSE"}
        });
        let msg: RoomClientMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(
            msg,
            RoomClientMessage::ScoreCategory { category: Category::FullHouse }
        ));
    }

    #[test]
    fn test_encode_error_event() {
        let event = RoomServerEvent::Error {
            code: ErrorCode::NotYourTurn,
            message: "not your turn".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["payload"]["code"], "NOT_YOUR_TURN");
    }
}
