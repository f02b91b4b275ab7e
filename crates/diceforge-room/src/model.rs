//! The `GameRoom`'s internal domain model.
//!
//! This is deliberately a different shape from the wire views in
//! `diceforge_protocol::room_messages` — the internal model carries
//! bookkeeping (join order, rate-limit counters, the chat ring) that
//! never goes on the wire, and the wire views are derived from it with
//! `to_*_view` methods. Keeping them separate means a wire-format change
//! never forces a state-machine change and vice versa.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use diceforge_protocol::{
    derive_room_identity, Category, ChatMessage, ConnectionId, JoinRequestId, JoinRequestView,
    Phase as WirePhase, PlayerType as WirePlayerType, PlayerView, RankingEntry, RoomCode,
    RoomConfigView, RoomStateView, RoomStatus, RoomSummary, ScorecardEntry, UserId,
};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoringRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerType {
    Human,
    Ai,
}

impl From<PlayerType> for WirePlayerType {
    fn from(value: PlayerType) -> Self {
        match value {
            PlayerType::Human => WirePlayerType::Human,
            PlayerType::Ai => WirePlayerType::Ai,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_seed: String,
    pub player_type: PlayerType,
    pub is_host: bool,
    pub is_connected: bool,
    pub current_connection_id: Option<ConnectionId>,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// `None` = unscored. Keyed by every category so lookups never miss.
    pub scorecard: HashMap<Category, Option<u32>>,
    pub total_score: u32,
    pub yahtzee_bonus_count: u32,
    pub current_dice: Option<[u8; 5]>,
    pub kept_mask: [bool; 5],
    pub rolls_remaining: u8,
}

impl PlayerState {
    pub fn new(
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        player_type: PlayerType,
        is_host: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let mut scorecard = HashMap::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            scorecard.insert(category, None);
        }
        Self {
            user_id,
            display_name,
            avatar_seed,
            player_type,
            is_host,
            is_connected: true,
            current_connection_id: None,
            joined_at: now,
            last_active_at: now,
            scorecard,
            total_score: 0,
            yahtzee_bonus_count: 0,
            current_dice: None,
            kept_mask: [false; 5],
            rolls_remaining: 0,
        }
    }

    pub fn scorecard_full(&self) -> bool {
        self.scorecard.values().all(|v| v.is_some())
    }

    pub fn reset_for_rematch(&mut self) {
        for value in self.scorecard.values_mut() {
            *value = None;
        }
        self.total_score = 0;
        self.yahtzee_bonus_count = 0;
        self.current_dice = None;
        self.kept_mask = [false; 5];
        self.rolls_remaining = 0;
    }

    pub fn to_view(&self, redact_private: bool) -> PlayerView {
        let mut scorecard: Vec<ScorecardEntry> = self
            .scorecard
            .iter()
            .map(|(category, value)| ScorecardEntry {
                category: *category,
                value: *value,
            })
            .collect();
        scorecard.sort_by_key(|entry| Category::ALL.iter().position(|c| *c == entry.category));

        PlayerView {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            avatar_seed: self.avatar_seed.clone(),
            player_type: self.player_type.into(),
            is_host: self.is_host,
            is_connected: self.is_connected,
            last_active_at: self.last_active_at,
            scorecard,
            total_score: self.total_score,
            current_dice: if redact_private { None } else { self.current_dice },
            kept_mask: if redact_private { None } else { Some(self.kept_mask) },
            rolls_remaining: self.rolls_remaining,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Waiting,
    Starting,
    TurnRoll,
    TurnDecide,
    Scoring,
    GameOver,
}

impl From<Phase> for WirePhase {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Waiting => WirePhase::Waiting,
            Phase::Starting => WirePhase::Starting,
            Phase::TurnRoll => WirePhase::TurnRoll,
            Phase::TurnDecide => WirePhase::TurnDecide,
            Phase::Scoring => WirePhase::Scoring,
            Phase::GameOver => WirePhase::GameOver,
        }
    }
}

impl Phase {
    pub fn status(self) -> RoomStatus {
        match self {
            Phase::Waiting | Phase::Starting | Phase::GameOver => {
                if self == Phase::GameOver {
                    RoomStatus::Finished
                } else {
                    RoomStatus::Waiting
                }
            }
            Phase::TurnRoll | Phase::TurnDecide | Phase::Scoring => RoomStatus::Playing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Declined,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub requester_id: UserId,
    pub requester_display_name: String,
    pub requester_avatar_seed: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: JoinRequestStatus,
}

impl JoinRequest {
    pub fn to_view(&self) -> JoinRequestView {
        JoinRequestView {
            id: self.id,
            requester_id: self.requester_id.clone(),
            requester_display_name: self.requester_display_name.clone(),
            requester_avatar_seed: self.requester_avatar_seed.clone(),
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    pub max_players: u8,
    pub is_public: bool,
    pub allow_spectators: bool,
}

/// The room's full state, as persisted under the `game_state` key.
///
/// This is `GameRoom`'s entire durable surface except `session_index`
/// and `alarm_data`, which are persisted separately (see `storage.rs`)
/// since they change at different rates and are rebuilt differently on
/// cold start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub code: RoomCode,
    pub config: RoomSettings,
    pub host_user_id: Option<UserId>,
    pub players: Vec<PlayerState>,
    pub spectator_count: u32,
    pub phase: Phase,
    pub turn_number: u32,
    pub round_number: u32,
    pub current_player_index: Option<usize>,
    pub player_order: Vec<UserId>,
    pub game_started_at: Option<DateTime<Utc>>,
    pub game_completed_at: Option<DateTime<Utc>>,
    pub rankings: Option<Vec<RankingEntry>>,
    pub chat: VecDeque<ChatMessage>,
    pub join_requests: HashMap<JoinRequestId, JoinRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub host_disconnected_since: Option<DateTime<Utc>>,
    pub turn_started_at: Option<DateTime<Utc>>,
    /// Set the instant the last connection detaches, cleared the instant a
    /// connection attaches. Drives the `room_cleanup` obligation — see
    /// [`RoomState::next_obligation`].
    pub empty_since: Option<DateTime<Utc>>,
    /// Whether the AFK warning has already fired for the current turn; once
    /// true, the next obligation for this turn is `afk_timeout` instead.
    pub afk_warned: bool,
    /// When `START_GAME` transitioned the room into `Starting`; the
    /// `game_start` obligation fires `starting_countdown_seconds` after this.
    pub starting_at: Option<DateTime<Utc>>,
}

impl RoomState {
    pub fn new(code: RoomCode, config: RoomSettings, now: DateTime<Utc>) -> Self {
        Self {
            code,
            config,
            host_user_id: None,
            players: Vec::new(),
            spectator_count: 0,
            phase: Phase::Waiting,
            turn_number: 0,
            round_number: 0,
            current_player_index: None,
            player_order: Vec::new(),
            game_started_at: None,
            game_completed_at: None,
            rankings: None,
            chat: VecDeque::with_capacity(diceforge_protocol::CHAT_HISTORY_SIZE),
            join_requests: HashMap::new(),
            created_at: now,
            updated_at: now,
            host_disconnected_since: None,
            turn_started_at: None,
            empty_since: Some(now),
            afk_warned: false,
            starting_at: None,
        }
    }

    /// Derives the single next wall-clock obligation from durable state —
    /// the "next wake is always the minimum of all pending obligations"
    /// rule in §4.2. Recomputed after every mutation that could have
    /// changed one of the candidate deadlines, so the actor's one alarm
    /// slot always holds the true minimum rather than whichever obligation
    /// happened to be scheduled most recently.
    pub fn next_obligation(&self, config: &crate::config::RoomConfig) -> Option<(crate::alarm::AlarmKind, DateTime<Utc>)> {
        use crate::alarm::AlarmKind;
        let mut candidates: Vec<(AlarmKind, DateTime<Utc>)> = Vec::new();

        if self.phase == Phase::Starting {
            if let Some(starting_at) = self.starting_at {
                candidates.push((
                    AlarmKind::GameStart,
                    starting_at + chrono::Duration::seconds(config.starting_countdown_seconds as i64),
                ));
            }
        }
        if matches!(self.phase, Phase::TurnRoll | Phase::TurnDecide) {
            if let Some(turn_started) = self.turn_started_at {
                if !self.afk_warned {
                    candidates.push((
                        AlarmKind::AfkWarning,
                        turn_started + chrono::Duration::seconds(config.afk_warning_seconds as i64),
                    ));
                } else {
                    candidates.push((
                        AlarmKind::AfkTimeout,
                        turn_started + chrono::Duration::seconds(config.afk_timeout_seconds as i64),
                    ));
                }
            }
        }
        if let Some(since) = self.host_disconnected_since {
            candidates.push((
                AlarmKind::HostGraceExpiry,
                since + chrono::Duration::seconds(config.host_grace_seconds as i64),
            ));
        }
        if let Some(since) = self.empty_since {
            let millis = config.room_cleanup.as_millis() as i64;
            candidates.push((AlarmKind::RoomCleanup, since + chrono::Duration::milliseconds(millis)));
        }
        let earliest_join_request = self
            .join_requests
            .values()
            .filter(|r| r.status == JoinRequestStatus::Pending)
            .min_by_key(|r| r.expires_at)
            .map(|r| (AlarmKind::JoinRequestExpiry(r.id), r.expires_at));
        if let Some(candidate) = earliest_join_request {
            candidates.push(candidate);
        }

        candidates.into_iter().min_by_key(|(_, at)| *at)
    }

    pub fn player_mut(&mut self, user_id: &UserId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| &p.user_id == user_id)
    }

    pub fn player(&self, user_id: &UserId) -> Option<&PlayerState> {
        self.players.iter().find(|p| &p.user_id == user_id)
    }

    pub fn current_player_id(&self) -> Option<&UserId> {
        let idx = self.current_player_index?;
        self.player_order.get(idx)
    }

    pub fn to_state_view(&self) -> RoomStateView {
        RoomStateView {
            code: self.code.as_str().to_string(),
            config: RoomConfigView {
                max_players: self.config.max_players,
                is_public: self.config.is_public,
            },
            host_user_id: self
                .host_user_id
                .clone()
                .unwrap_or_else(|| UserId::from("")),
            players: self.players.iter().map(|p| p.to_view(false)).collect(),
            spectator_count: self.spectator_count,
            phase: self.phase.into(),
            turn_number: self.turn_number,
            round_number: self.round_number,
            current_player_index: self.current_player_index,
            player_order: self.player_order.clone(),
            game_started_at: self.game_started_at,
            game_completed_at: self.game_completed_at,
            rankings: self.rankings.clone(),
        }
    }

    pub fn to_summary(&self, host_display_name: String) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            host_display_name,
            player_count: self.players.len() as u8,
            max_players: self.config.max_players,
            spectator_count: self.spectator_count,
            is_public: self.config.is_public,
            status: self.phase.status(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            identity: derive_room_identity(&self.code),
        }
    }

    /// Computes final rankings per the tie-break policy recorded in
    /// `DESIGN.md`: primary `totalScore` desc, secondary count of
    /// perfect-category scores desc, remaining ties share a dense rank.
    pub fn compute_rankings(&self, rules: &dyn ScoringRules) -> Vec<RankingEntry> {
        let mut scored: Vec<(&PlayerState, u32)> = self
            .players
            .iter()
            .map(|p| {
                let perfects = p
                    .scorecard
                    .iter()
                    .filter(|(category, value)| {
                        value.map(|v| v == rules.max_value(**category)).unwrap_or(false)
                    })
                    .count() as u32;
                (p, perfects)
            })
            .collect();

        scored.sort_by(|(a, a_perfects), (b, b_perfects)| {
            b.total_score
                .cmp(&a.total_score)
                .then(b_perfects.cmp(a_perfects))
        });

        let mut rankings = Vec::with_capacity(scored.len());
        let mut rank = 0u32;
        let mut previous: Option<(u32, u32)> = None;
        for (index, (player, perfects)) in scored.iter().enumerate() {
            let key = (player.total_score, *perfects);
            if previous != Some(key) {
                rank = index as u32 + 1;
                previous = Some(key);
            }
            rankings.push(RankingEntry {
                user_id: player.user_id.clone(),
                rank,
                total_score: player.total_score,
            });
        }
        rankings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::StandardScoring;

    fn sample_room() -> RoomState {
        let mut room = RoomState::new(
            diceforge_protocol::RoomCode::parse("ABC123").unwrap(),
            RoomSettings {
                max_players: 6,
                is_public: true,
                allow_spectators: false,
            },
            Utc::now(),
        );
        room.players.push(PlayerState::new(
            UserId::from("a"),
            "Alice".into(),
            "seed".into(),
            PlayerType::Human,
            true,
            Utc::now(),
        ));
        room.players.push(PlayerState::new(
            UserId::from("b"),
            "Bob".into(),
            "seed".into(),
            PlayerType::Human,
            false,
            Utc::now(),
        ));
        room
    }

    #[test]
    fn test_rankings_order_by_total_score_desc() {
        let mut room = sample_room();
        room.players[0].total_score = 100;
        room.players[1].total_score = 200;
        let rankings = room.compute_rankings(&StandardScoring);
        assert_eq!(rankings[0].user_id, UserId::from("b"));
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[1].rank, 2);
    }

    #[test]
    fn test_rankings_tie_shares_dense_rank() {
        let mut room = sample_room();
        room.players[0].total_score = 150;
        room.players[1].total_score = 150;
        let rankings = room.compute_rankings(&StandardScoring);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[1].rank, 1);
    }

    #[test]
    fn test_scorecard_full_detection() {
        let mut room = sample_room();
        assert!(!room.players[0].scorecard_full());
        for category in Category::ALL {
            room.players[0].scorecard.insert(category, Some(0));
        }
        assert!(room.players[0].scorecard_full());
    }
}
