//! `GameRoom`: an isolated Tokio task owning one dice game's state.
//!
//! Mirrors the teacher's actor shape — a task reading an mpsc command
//! channel, a cloneable [`RoomHandle`] wrapping the sender — but the
//! command catalog is now the concrete dice-game operations from
//! `diceforge_protocol::room_messages` instead of a generic `GameLogic`
//! trait, and the actor drives a single [`crate::alarm::RoomAlarm`]
//! instead of a fixed-timestep tick.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use diceforge_protocol::{
    Category, ChatMessage, ConnectionId, JoinRequestId, JoinRequestView, MessageId,
    ReactionTally, RoomClientMessage, RoomCode, RoomServerEvent, RoomSummary, UserId,
    CHAT_HISTORY_SIZE,
};
use diceforge_session::{SessionConfig, SessionManager};
use tokio::sync::{mpsc, oneshot};

use crate::alarm::{AlarmKind, RoomAlarm};
use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::lobby_sink::LobbySink;
use crate::model::{
    JoinRequest, JoinRequestStatus, Phase, PlayerState, PlayerType, RoomSettings, RoomState,
};
use crate::scoring::ScoringRules;
use crate::storage::RoomStorage;

pub type OutboundSender = mpsc::UnboundedSender<RoomServerEvent>;

/// Everything the actor needs about one attached socket beyond what
/// [`diceforge_session::ConnectionSession`] already tracks.
struct RateLimits {
    chat: diceforge_protocol::RateLimitState,
}

enum RoomCommand {
    Attach {
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<ConnectionId, RoomError>>,
    },
    Detach {
        connection_id: ConnectionId,
    },
    Client {
        user_id: UserId,
        message: RoomClientMessage,
    },
    SubmitJoinRequest {
        requester: UserId,
        display_name: String,
        avatar_seed: String,
        reply: oneshot::Sender<Result<JoinRequestView, RoomError>>,
    },
    CancelJoinRequest {
        requester: UserId,
    },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
    Shutdown,
}

/// Cheap-to-clone handle to a running `GameRoom` actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Registers a new socket with the room and returns the connection
    /// id it was assigned. The actor immediately pushes a `RoomState`
    /// snapshot and `ChatHistory` down `outbound` before this call
    /// returns — callers don't need to request them separately.
    pub async fn attach(
        &self,
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
    ) -> Result<ConnectionId, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Attach {
                user_id,
                display_name,
                avatar_seed,
                outbound,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    pub async fn detach(&self, connection_id: ConnectionId) {
        let _ = self.sender.send(RoomCommand::Detach { connection_id }).await;
    }

    /// Dispatches a decoded client message. Fire-and-forget — errors
    /// surface to the sender as a `RoomServerEvent::Error` on their own
    /// outbound channel, not as a `Result` here.
    pub async fn dispatch(&self, user_id: UserId, message: RoomClientMessage) {
        let _ = self
            .sender
            .send(RoomCommand::Client { user_id, message })
            .await;
    }

    /// Forwards a `REQUEST_JOIN` the lobby received for this room.
    pub async fn submit_join_request(
        &self,
        requester: UserId,
        display_name: String,
        avatar_seed: String,
    ) -> Result<JoinRequestView, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::SubmitJoinRequest {
                requester,
                display_name,
                avatar_seed,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    pub async fn cancel_join_request(&self, requester: UserId) {
        let _ = self
            .sender
            .send(RoomCommand::CancelJoinRequest { requester })
            .await;
    }

    /// A lightweight summary for the `/room/:code/info` HTTP endpoint and
    /// for mirroring into the lobby directory.
    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Summary { reply })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }

    /// Resolves once the actor's command loop has ended, whether from an
    /// explicit [`shutdown`](Self::shutdown) or the actor cleaning itself up
    /// after `room_cleanup` fires. [`crate::manager::RoomManager`] awaits
    /// this to know when to forget the room's handle.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }
}

struct RoomActor {
    code: RoomCode,
    config: RoomConfig,
    state: RoomState,
    alarm: RoomAlarm,
    storage: Arc<dyn RoomStorage>,
    lobby: Arc<dyn LobbySink>,
    scoring: Arc<dyn ScoringRules>,
    sessions: SessionManager,
    connections: HashMap<ConnectionId, OutboundSender>,
    rate_limits: HashMap<UserId, RateLimits>,
    receiver: mpsc::Receiver<RoomCommand>,
    stopping: bool,
}

const COMMAND_CHANNEL_SIZE: usize = 128;

/// Spawns a fresh `GameRoom` actor for `code` with no persisted state to
/// restore. Used on first creation; restoring a hibernated room from
/// storage is `spawn_restoring`.
pub fn spawn(
    code: RoomCode,
    config: RoomConfig,
    storage: Arc<dyn RoomStorage>,
    lobby: Arc<dyn LobbySink>,
    scoring: Arc<dyn ScoringRules>,
    is_public: bool,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let now = Utc::now();
    let settings = RoomSettings {
        max_players: config.max_players,
        is_public,
        allow_spectators: config.allow_spectators,
    };
    let actor = RoomActor {
        code: code.clone(),
        config,
        state: RoomState::new(code.clone(), settings, now),
        alarm: RoomAlarm::new(),
        storage,
        lobby,
        scoring,
        sessions: SessionManager::new(SessionConfig {
            reconnect_grace_secs: 30,
        }),
        connections: HashMap::new(),
        rate_limits: HashMap::new(),
        receiver: rx,
        stopping: false,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender: tx }
}

/// Spawns a `GameRoom` actor recreated from `storage`'s persisted keys —
/// the "hibernation wakeup" path. Falls back to a fresh room if nothing
/// was ever saved (e.g. storage backs a code nobody has used yet).
pub async fn spawn_restoring(
    code: RoomCode,
    config: RoomConfig,
    storage: Arc<dyn RoomStorage>,
    lobby: Arc<dyn LobbySink>,
    scoring: Arc<dyn ScoringRules>,
    is_public: bool,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let settings = RoomSettings {
        max_players: config.max_players,
        is_public,
        allow_spectators: config.allow_spectators,
    };
    let state = storage
        .load_game_state()
        .await
        .unwrap_or_else(|| RoomState::new(code.clone(), settings, Utc::now()));
    let mut sessions = SessionManager::new(SessionConfig {
        reconnect_grace_secs: 30,
    });
    sessions.restore(storage.load_session_index().await);
    let mut alarm = RoomAlarm::new();
    alarm.restore(storage.load_alarm().await);

    let actor = RoomActor {
        code: code.clone(),
        config,
        state,
        alarm,
        storage,
        lobby,
        scoring,
        sessions,
        connections: HashMap::new(),
        rate_limits: HashMap::new(),
        receiver: rx,
        stopping: false,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender: tx }
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(code = %self.code, "room actor started");
        self.reschedule();

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                kind = self.alarm.wait() => {
                    self.handle_alarm(kind).await;
                    if self.stopping {
                        break;
                    }
                }
            }
        }

        tracing::info!(code = %self.code, "room actor stopped");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Attach {
                user_id,
                display_name,
                avatar_seed,
                outbound,
                reply,
            } => {
                let result = self.handle_attach(user_id, display_name, avatar_seed, outbound);
                self.persist_sessions();
                let _ = reply.send(result);
            }
            RoomCommand::Detach { connection_id } => {
                self.handle_detach(connection_id).await;
                self.persist_sessions();
            }
            RoomCommand::Client { user_id, message } => {
                self.handle_client_message(user_id, message).await;
            }
            RoomCommand::SubmitJoinRequest {
                requester,
                display_name,
                avatar_seed,
                reply,
            } => {
                let result = self
                    .handle_submit_join_request(requester, display_name, avatar_seed)
                    .await;
                let _ = reply.send(result);
            }
            RoomCommand::CancelJoinRequest { requester } => {
                self.handle_cancel_join_request(&requester).await;
            }
            RoomCommand::Summary { reply } => {
                let host_name = self
                    .state
                    .host_user_id
                    .as_ref()
                    .and_then(|id| self.state.player(id))
                    .map(|p| p.display_name.clone())
                    .unwrap_or_default();
                let _ = reply.send(self.state.to_summary(host_name));
            }
            RoomCommand::Shutdown => {
                tracing::info!(code = %self.code, "room shutting down");
                return true;
            }
        }
        false
    }

    fn handle_attach(
        &mut self,
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
    ) -> Result<ConnectionId, RoomError> {
        let session = self
            .sessions
            .create(user_id.clone(), display_name, avatar_seed)
            .map_err(|e| RoomError::Internal(e.to_string()))?;
        let connection_id = session.connection_id;
        self.connections.insert(connection_id, outbound.clone());

        if let Some(player) = self.state.player_mut(&user_id) {
            player.is_connected = true;
            player.current_connection_id = Some(connection_id);
            if self.state.host_user_id.as_ref() == Some(&user_id) {
                self.state.host_disconnected_since = None;
            }
        }
        self.state.empty_since = None;
        self.reschedule();

        let _ = outbound.send(RoomServerEvent::RoomState {
            room: self.state.to_state_view(),
        });
        let _ = outbound.send(RoomServerEvent::ChatHistory {
            messages: self.state.chat.iter().cloned().collect(),
        });
        Ok(connection_id)
    }

    async fn handle_detach(&mut self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        let Some(session) = self.sessions.get_by_connection(&connection_id).cloned_user() else {
            return;
        };
        let _ = self.sessions.disconnect(&session);
        if let Some(player) = self.state.player_mut(&session) {
            player.is_connected = false;
            if self.state.host_user_id.as_ref() == Some(&session) {
                self.state.host_disconnected_since = Some(Utc::now());
            }
        }
        if self.connections.is_empty() {
            self.state.empty_since = Some(Utc::now());
        }
        self.reschedule();
        self.persist_and_broadcast_update().await;
    }

    async fn handle_client_message(&mut self, user_id: UserId, message: RoomClientMessage) {
        let result = match message {
            RoomClientMessage::JoinRoom => self.on_join_room(&user_id).await,
            RoomClientMessage::LeaveRoom => self.on_leave_room(&user_id).await,
            RoomClientMessage::StartGame => self.on_start_game(&user_id).await,
            RoomClientMessage::RollDice { kept_mask } => self.on_roll_dice(&user_id, kept_mask).await,
            RoomClientMessage::KeepDice { indices } => self.on_keep_dice(&user_id, indices).await,
            RoomClientMessage::ScoreCategory { category } => {
                self.on_score_category(&user_id, category).await
            }
            RoomClientMessage::Chat { content, shout } => self.on_chat(&user_id, content, shout).await,
            RoomClientMessage::React { message_id, emoji, add } => {
                self.on_react(&user_id, message_id, emoji, add).await
            }
            RoomClientMessage::JoinRequestResponse { request_id, approve } => {
                self.on_join_request_response(&user_id, request_id, approve).await
            }
            RoomClientMessage::Rematch => self.on_rematch(&user_id).await,
            RoomClientMessage::TypingStart => self.on_typing(&user_id, true),
            RoomClientMessage::TypingStop => self.on_typing(&user_id, false),
        };
        if let Err(err) = result {
            self.send_error(&user_id, err);
        }
    }

    async fn on_join_room(&mut self, user_id: &UserId) -> Result<(), RoomError> {
        if self.state.player(user_id).is_some() {
            return Ok(());
        }
        if self.state.players.len() >= self.state.config.max_players as usize {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        let session = self
            .sessions
            .get(user_id)
            .ok_or(RoomError::Internal("no session for join".into()))?;
        let now = Utc::now();
        let is_host = self.state.host_user_id.is_none();
        let mut player = PlayerState::new(
            user_id.clone(),
            session.display_name.clone(),
            session.avatar_seed.clone(),
            PlayerType::Human,
            is_host,
            now,
        );
        player.current_connection_id = Some(session.connection_id);
        if is_host {
            self.state.host_user_id = Some(user_id.clone());
        }
        self.state.players.push(player);
        self.state.updated_at = now;
        self.persist_and_broadcast_update().await;
        self.mirror_summary();
        Ok(())
    }

    async fn on_leave_room(&mut self, user_id: &UserId) -> Result<(), RoomError> {
        let was_host = self.state.host_user_id.as_ref() == Some(user_id);
        self.state.players.retain(|p| &p.user_id != user_id);
        if was_host {
            self.transfer_host();
        }
        self.state.updated_at = Utc::now();
        self.persist_and_broadcast_update().await;
        self.mirror_summary();
        Ok(())
    }

    async fn on_start_game(&mut self, user_id: &UserId) -> Result<(), RoomError> {
        self.require_host(user_id)?;
        if self.state.phase != Phase::Waiting {
            return Err(RoomError::InvalidStatusTransition("game already started".into()));
        }
        if self.state.players.len() < self.config.min_players {
            return Err(RoomError::NotEnoughPlayers);
        }
        let order = crate::rng::shuffle_player_order(
            &self.state.players.iter().map(|p| p.user_id.clone()).collect::<Vec<_>>(),
        );
        self.state.player_order = order.clone();
        self.state.phase = Phase::Starting;
        self.state.round_number = 1;
        self.state.starting_at = Some(Utc::now());
        self.persist_and_broadcast(RoomServerEvent::GameStarting {
            starts_in_seconds: self.config.starting_countdown_seconds as u8,
            player_order: order,
        })
        .await;
        self.reschedule();
        Ok(())
    }

    async fn on_roll_dice(&mut self, user_id: &UserId, kept_mask: [bool; 5]) -> Result<(), RoomError> {
        self.require_current_turn(user_id)?;
        if self.state.phase != Phase::TurnRoll && self.state.phase != Phase::TurnDecide {
            return Err(RoomError::InvalidStatusTransition("not your roll phase".into()));
        }
        let player = self.state.player_mut(user_id).expect("checked by require_current_turn");
        if player.rolls_remaining == 0 {
            return Err(RoomError::NoRolls);
        }
        let mut dice = player.current_dice.unwrap_or([0; 5]);
        crate::rng::roll_unmasked(&mut dice, &kept_mask);
        player.current_dice = Some(dice);
        player.kept_mask = kept_mask;
        player.rolls_remaining -= 1;
        player.last_active_at = Utc::now();
        let rolls_remaining = player.rolls_remaining;
        self.state.phase = Phase::TurnDecide;
        self.reset_afk_timer();
        self.persist_and_broadcast(RoomServerEvent::DiceRolled {
            user_id: user_id.clone(),
            dice,
            rolls_remaining,
        })
        .await;
        Ok(())
    }

    async fn on_keep_dice(&mut self, user_id: &UserId, indices: Vec<u8>) -> Result<(), RoomError> {
        self.require_current_turn(user_id)?;
        let player = self.state.player_mut(user_id).expect("checked by require_current_turn");
        let mut mask = [false; 5];
        for idx in indices {
            if let Some(slot) = mask.get_mut(idx as usize) {
                *slot = true;
            }
        }
        player.kept_mask = mask;
        player.last_active_at = Utc::now();
        self.reset_afk_timer();
        self.persist_and_broadcast(RoomServerEvent::DiceKept {
            user_id: user_id.clone(),
            kept_mask: mask,
        })
        .await;
        Ok(())
    }

    async fn on_score_category(&mut self, user_id: &UserId, category: Category) -> Result<(), RoomError> {
        self.require_current_turn(user_id)?;
        let scoring = self.scoring.clone();
        let player = self.state.player_mut(user_id).expect("checked by require_current_turn");
        if player.scorecard.get(&category).copied().flatten().is_some() {
            return Err(RoomError::AlreadyScored);
        }
        if player.rolls_remaining == self.config.max_rolls_per_turn {
            return Err(RoomError::InvalidStatusTransition("no dice rolled".into()));
        }
        let dice = player.current_dice.ok_or(RoomError::InvalidStatusTransition("no dice rolled".into()))?;
        let yahtzee_scored = player.scorecard.get(&Category::Yahtzee).copied().flatten().is_some();
        let mut value = scoring.score(category, &dice, yahtzee_scored);
        if scoring.is_bonus_yahtzee(&dice, yahtzee_scored) {
            value += crate::scoring::YAHTZEE_BONUS;
            player.yahtzee_bonus_count += 1;
        }
        player.scorecard.insert(category, Some(value));
        player.total_score += value;
        player.current_dice = None;
        player.kept_mask = [false; 5];
        player.rolls_remaining = 0;
        let scorecard_full = player.scorecard_full();
        self.persist_and_broadcast(RoomServerEvent::CategoryScored {
            user_id: user_id.clone(),
            category,
            value,
        })
        .await;

        if scorecard_full && self.state.players.iter().all(|p| p.scorecard_full()) {
            self.finish_game().await;
        } else {
            self.advance_turn().await;
        }
        Ok(())
    }

    async fn on_chat(&mut self, user_id: &UserId, content: String, shout: bool) -> Result<(), RoomError> {
        let trimmed = diceforge_protocol::validate_content(&content)
            .map_err(|_| RoomError::TooLong)?
            .to_string();
        let now = Utc::now();
        let limits = self
            .rate_limits
            .entry(user_id.clone())
            .or_insert_with(|| RateLimits { chat: Default::default() });
        if let diceforge_protocol::RateLimitDecision::Reject { remaining_ms } =
            limits.chat.check_message(now)
        {
            return Err(RoomError::RateLimited { remaining_ms: remaining_ms as u64 });
        }
        if shout {
            if let diceforge_protocol::RateLimitDecision::Reject { remaining_ms } =
                limits.chat.check_shout(now)
            {
                return Err(RoomError::RateLimited { remaining_ms: remaining_ms as u64 });
            }
        }
        let display_name = self
            .state
            .player(user_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| user_id.to_string());
        let message = ChatMessage {
            id: MessageId::new(),
            author_id: user_id.clone(),
            author_display_name: display_name,
            content: trimmed,
            shout,
            sent_at: now,
            reactions: Vec::new(),
        };
        if self.state.chat.len() >= CHAT_HISTORY_SIZE {
            self.state.chat.pop_front();
        }
        self.state.chat.push_back(message.clone());
        self.persist_and_broadcast(RoomServerEvent::ChatMessage { message }).await;
        Ok(())
    }

    async fn on_react(
        &mut self,
        user_id: &UserId,
        message_id: String,
        emoji: String,
        add: bool,
    ) -> Result<(), RoomError> {
        let now = Utc::now();
        let limits = self
            .rate_limits
            .entry(user_id.clone())
            .or_insert_with(|| RateLimits { chat: Default::default() });
        if let diceforge_protocol::RateLimitDecision::Reject { remaining_ms } =
            limits.chat.check_reaction(now)
        {
            return Err(RoomError::RateLimited { remaining_ms: remaining_ms as u64 });
        }
        // `message_id` arrives as the bare UUID clients were sent in
        // `ChatMessage` (`MessageId` serializes `#[serde(transparent)]`),
        // not `MessageId`'s `Display` form (`"msg-<uuid>"`).
        let Some(message) = self
            .state
            .chat
            .iter_mut()
            .find(|m| m.id.0.to_string() == message_id)
        else {
            return Err(RoomError::MessageNotFound);
        };
        let tally = match message.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(tally) => tally,
            None => {
                message.reactions.push(ReactionTally {
                    emoji: emoji.clone(),
                    user_ids: Vec::new(),
                });
                message.reactions.last_mut().expect("just pushed")
            }
        };
        if add {
            if !tally.user_ids.contains(user_id) {
                tally.user_ids.push(user_id.clone());
            }
        } else {
            tally.user_ids.retain(|u| u != user_id);
        }
        let user_ids = tally.user_ids.clone();
        self.persist_and_broadcast(RoomServerEvent::ReactionUpdate { message_id, emoji, user_ids })
            .await;
        Ok(())
    }

    async fn on_join_request_response(
        &mut self,
        user_id: &UserId,
        request_id: JoinRequestId,
        approve: bool,
    ) -> Result<(), RoomError> {
        self.require_host(user_id)?;
        let request = self
            .state
            .join_requests
            .get_mut(&request_id)
            .ok_or(RoomError::Expired)?;
        if request.status != JoinRequestStatus::Pending {
            return Err(RoomError::Expired);
        }
        request.status = if approve {
            JoinRequestStatus::Approved
        } else {
            JoinRequestStatus::Declined
        };
        let requester = request.requester_id.clone();
        self.reschedule();
        self.persist_and_broadcast(RoomServerEvent::JoinRequestResolved { request_id, approved: approve })
            .await;

        let lobby = self.lobby.clone();
        let code = self.code.clone();
        let requester_for_release = requester.clone();
        tokio::spawn(async move {
            if approve {
                lobby.deliver_join_approved(requester, code.clone()).await;
            } else {
                lobby.deliver_join_declined(requester, code.clone()).await;
            }
            lobby.release_join_slot(requester_for_release, request_id).await;
        });
        Ok(())
    }

    async fn on_rematch(&mut self, user_id: &UserId) -> Result<(), RoomError> {
        self.require_host(user_id)?;
        if self.state.phase != Phase::GameOver {
            return Err(RoomError::InvalidStatusTransition("game not finished".into()));
        }
        for player in &mut self.state.players {
            player.reset_for_rematch();
        }
        self.state.phase = Phase::Waiting;
        self.state.turn_number = 0;
        self.state.round_number = 0;
        self.state.current_player_index = None;
        self.state.player_order.clear();
        self.state.game_started_at = None;
        self.state.game_completed_at = None;
        self.state.rankings = None;
        self.persist_and_broadcast_update().await;
        Ok(())
    }

    fn on_typing(&mut self, user_id: &UserId, is_typing: bool) -> Result<(), RoomError> {
        let now = Utc::now();
        let limits = self
            .rate_limits
            .entry(user_id.clone())
            .or_insert_with(|| RateLimits { chat: Default::default() });
        if is_typing {
            if let diceforge_protocol::RateLimitDecision::Reject { .. } = limits.chat.check_typing(now) {
                return Ok(());
            }
        }
        self.broadcast(RoomServerEvent::TypingIndicator {
            user_id: user_id.clone(),
            is_typing,
        });
        Ok(())
    }

    async fn handle_submit_join_request(
        &mut self,
        requester: UserId,
        display_name: String,
        avatar_seed: String,
    ) -> Result<JoinRequestView, RoomError> {
        if self.state.players.iter().any(|p| p.user_id == requester) {
            return Err(RoomError::DuplicateRequest);
        }
        if self.state.players.len() >= self.state.config.max_players as usize {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        let now = Utc::now();
        let expires_at = now + ChronoDuration::milliseconds(self.config.join_request_ttl.as_millis() as i64);
        let id = JoinRequestId::new();
        let request = JoinRequest {
            id,
            requester_id: requester,
            requester_display_name: display_name,
            requester_avatar_seed: avatar_seed,
            created_at: now,
            expires_at,
            status: JoinRequestStatus::Pending,
        };
        let view = request.to_view();
        self.state.join_requests.insert(id, request);
        self.reschedule();
        self.persist_and_broadcast(RoomServerEvent::JoinRequestReceived { request: view.clone() })
            .await;
        Ok(view)
    }

    async fn handle_cancel_join_request(&mut self, requester: &UserId) {
        let id = self
            .state
            .join_requests
            .iter()
            .find(|(_, r)| &r.requester_id == requester && r.status == JoinRequestStatus::Pending)
            .map(|(id, _)| *id);
        if let Some(id) = id {
            if let Some(request) = self.state.join_requests.get_mut(&id) {
                request.status = JoinRequestStatus::Cancelled;
            }
            self.reschedule();
            self.persist_and_broadcast(RoomServerEvent::JoinRequestResolved { request_id: id, approved: false })
                .await;
        }
    }

    /// `AlarmScheduler::wait` consumes the fired record, so the slot is
    /// always empty by the time a `fire_*` handler returns — `reschedule`
    /// runs unconditionally afterward to repopulate it from whatever
    /// obligations remain, rather than trusting every handler to remember.
    async fn handle_alarm(&mut self, kind: AlarmKind) {
        match kind {
            AlarmKind::GameStart => self.fire_game_start().await,
            AlarmKind::AfkWarning => self.fire_afk_warning(),
            AlarmKind::AfkTimeout => self.fire_afk_timeout().await,
            AlarmKind::RoomCleanup => self.fire_room_cleanup(),
            AlarmKind::JoinRequestExpiry(id) => self.fire_join_request_expiry(id).await,
            AlarmKind::HostGraceExpiry => self.fire_host_grace_expiry().await,
        }
        if !self.stopping {
            self.reschedule();
        }
    }

    async fn fire_game_start(&mut self) {
        if self.state.phase != Phase::Starting {
            return;
        }
        self.state.phase = Phase::TurnRoll;
        self.state.turn_number = 1;
        self.state.current_player_index = Some(0);
        self.state.game_started_at = Some(Utc::now());
        if let Some(player) = self
            .state
            .current_player_id()
            .cloned()
            .and_then(|id| self.state.player_mut(&id))
        {
            player.rolls_remaining = self.config.max_rolls_per_turn;
            player.current_dice = None;
        }
        self.state.turn_started_at = Some(Utc::now());
        self.state.afk_warned = false;
        self.reschedule();
        let current = self.state.current_player_id().cloned().unwrap_or_else(|| UserId::from(""));
        self.persist_and_broadcast(RoomServerEvent::TurnStarted {
            user_id: current,
            turn_number: self.state.turn_number,
            round_number: self.state.round_number,
        })
        .await;
    }

    fn fire_afk_warning(&mut self) {
        let Some(current) = self.state.current_player_id().cloned() else { return };
        self.state.afk_warned = true;
        self.reschedule();
        self.broadcast(RoomServerEvent::AfkWarning {
            user_id: current,
            timeout_in_seconds: (self.config.afk_timeout_seconds - self.config.afk_warning_seconds) as u8,
        });
    }

    /// §4.2 `afk_timeout`: the laggard forfeits the turn. The lowest-impact
    /// unscored category (smallest `max_value`, ties broken by declaration
    /// order) is filled with zero so the scorecard still advances toward
    /// completion, then the turn passes on exactly as `SCORE_CATEGORY` would.
    async fn fire_afk_timeout(&mut self) {
        let Some(user_id) = self.state.current_player_id().cloned() else { return };
        let scoring = self.scoring.clone();
        let Some(player) = self.state.player_mut(&user_id) else { return };
        if player.scorecard_full() {
            return;
        }
        let category = Category::ALL
            .iter()
            .filter(|c| player.scorecard.get(c).copied().flatten().is_none())
            .min_by_key(|c| scoring.max_value(**c))
            .copied();
        let Some(category) = category else { return };
        player.scorecard.insert(category, Some(0));
        player.current_dice = None;
        player.kept_mask = [false; 5];
        player.rolls_remaining = 0;
        let scorecard_full = player.scorecard_full();
        self.persist_and_broadcast(RoomServerEvent::CategoryScored {
            user_id: user_id.clone(),
            category,
            value: 0,
        })
        .await;
        if scorecard_full && self.state.players.iter().all(|p| p.scorecard_full()) {
            self.finish_game().await;
        } else {
            self.advance_turn().await;
        }
    }

    /// `room_cleanup` firing means `empty_since` is still set and no one
    /// reattached in the meantime — the actor tears itself down. If a
    /// socket attached between the obligation being computed and this
    /// handler running, `empty_since` was already cleared and
    /// `next_obligation` would have produced a different (or no) alarm, so
    /// this branch never fires spuriously.
    fn fire_room_cleanup(&mut self) {
        if self.state.empty_since.is_none() || !self.connections.is_empty() {
            return;
        }
        tracing::info!(code = %self.code, "room actor cleaning up");
        self.stopping = true;
        let lobby = self.lobby.clone();
        let code = self.code.clone();
        tokio::spawn(async move { lobby.remove_room_summary(code).await });
    }

    async fn fire_join_request_expiry(&mut self, id: JoinRequestId) {
        if let Some(request) = self.state.join_requests.get_mut(&id) {
            if request.status == JoinRequestStatus::Pending {
                request.status = JoinRequestStatus::Expired;
                let requester = request.requester_id.clone();
                self.reschedule();
                self.persist_and_broadcast(RoomServerEvent::JoinRequestResolved { request_id: id, approved: false })
                    .await;
                let lobby = self.lobby.clone();
                let code = self.code.clone();
                tokio::spawn(async move {
                    lobby.deliver_join_declined(requester.clone(), code).await;
                    lobby.release_join_slot(requester, id).await;
                });
            }
        }
    }

    async fn fire_host_grace_expiry(&mut self) {
        if self.state.host_disconnected_since.is_some() {
            self.transfer_host();
            self.reschedule();
            self.persist_and_broadcast_update().await;
        }
    }

    fn transfer_host(&mut self) {
        self.state.host_disconnected_since = None;
        let next_host = self
            .state
            .players
            .iter()
            .filter(|p| p.is_connected)
            .min_by_key(|p| p.joined_at)
            .map(|p| p.user_id.clone());
        for player in &mut self.state.players {
            player.is_host = Some(&player.user_id) == next_host.as_ref();
        }
        self.state.host_user_id = next_host.clone();
        if let Some(new_host) = next_host {
            self.broadcast(RoomServerEvent::HostChanged { new_host_user_id: new_host });
        }
    }

    async fn advance_turn(&mut self) {
        let Some(idx) = self.state.current_player_index else { return };
        let player_count = self.state.player_order.len();
        if player_count == 0 {
            return;
        }
        let next_idx = (idx + 1) % player_count;
        if next_idx == 0 {
            self.state.round_number += 1;
        }
        self.state.current_player_index = Some(next_idx);
        self.state.turn_number += 1;
        self.state.phase = Phase::TurnRoll;
        self.state.turn_started_at = Some(Utc::now());
        self.state.afk_warned = false;
        if let Some(player) = self
            .state
            .current_player_id()
            .cloned()
            .and_then(|id| self.state.player_mut(&id))
        {
            player.rolls_remaining = self.config.max_rolls_per_turn;
            player.current_dice = None;
            player.kept_mask = [false; 5];
        }
        self.reschedule();
        let current = self.state.current_player_id().cloned().unwrap_or_else(|| UserId::from(""));
        self.persist_and_broadcast(RoomServerEvent::TurnStarted {
            user_id: current,
            turn_number: self.state.turn_number,
            round_number: self.state.round_number,
        })
        .await;
    }

    async fn finish_game(&mut self) {
        self.state.phase = Phase::GameOver;
        self.state.game_completed_at = Some(Utc::now());
        self.state.turn_started_at = None;
        let rankings = self.state.compute_rankings(self.scoring.as_ref());
        self.state.rankings = Some(rankings.clone());
        self.reschedule();
        self.persist_and_broadcast(RoomServerEvent::GameOver { rankings }).await;
    }

    /// Activity on the current turn (a roll or a keep) pushes the AFK
    /// clock back out to a fresh warning window.
    fn reset_afk_timer(&mut self) {
        self.state.turn_started_at = Some(Utc::now());
        self.state.afk_warned = false;
        self.reschedule();
    }

    fn require_host(&self, user_id: &UserId) -> Result<(), RoomError> {
        if self.state.host_user_id.as_ref() == Some(user_id) {
            Ok(())
        } else {
            Err(RoomError::NotHost)
        }
    }

    fn require_current_turn(&self, user_id: &UserId) -> Result<(), RoomError> {
        if self.state.current_player_id() == Some(user_id) {
            Ok(())
        } else {
            Err(RoomError::NotYourTurn)
        }
    }

    fn broadcast(&self, event: RoomServerEvent) {
        for outbound in self.connections.values() {
            let _ = outbound.send(event.clone());
        }
    }

    fn send_error(&self, user_id: &UserId, err: RoomError) {
        if let Some(session) = self.sessions.get(user_id) {
            if let Some(outbound) = self.connections.get(&session.connection_id) {
                let _ = outbound.send(RoomServerEvent::Error {
                    code: err.code(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Storage-first, broadcast-second: persists `game_state` before any
    /// client-visible event goes out, per the invariant in §6. Awaited
    /// directly rather than spawned — the actor is single-threaded per
    /// room, so there is no one else to race with, and a spawned write
    /// could in principle still be in flight when `broadcast` runs.
    async fn persist_and_broadcast(&mut self, event: RoomServerEvent) {
        self.state.updated_at = Utc::now();
        self.storage.save_game_state(self.state.clone()).await;
        self.broadcast(event);
    }

    async fn persist_and_broadcast_update(&mut self) {
        let event = RoomServerEvent::RoomUpdated { room: self.state.to_state_view() };
        self.persist_and_broadcast(event).await;
    }

    fn persist_alarm(&self) {
        let storage = self.storage.clone();
        let record = self.alarm.pending().cloned();
        tokio::spawn(async move { storage.save_alarm(record).await });
    }

    fn persist_sessions(&self) {
        let storage = self.storage.clone();
        let entries = self.sessions.session_index();
        tokio::spawn(async move { storage.save_session_index(entries).await });
    }

    fn mirror_summary(&self) {
        let host_name = self
            .state
            .host_user_id
            .as_ref()
            .and_then(|id| self.state.player(id))
            .map(|p| p.display_name.clone())
            .unwrap_or_default();
        let summary = self.state.to_summary(host_name);
        let lobby = self.lobby.clone();
        tokio::spawn(async move { lobby.upsert_room_summary(summary).await });
    }

    fn schedule_alarm_at(&mut self, kind: AlarmKind, at: DateTime<Utc>) {
        self.alarm.schedule(kind, at);
        self.persist_alarm();
    }

    /// Recomputes the single next wall-clock obligation from durable state
    /// and reprograms the actor's one alarm slot to match. Called after
    /// every mutation that could have changed a candidate deadline, so two
    /// obligations racing to be "the" scheduled alarm never happens — the
    /// alarm is a pure function of state, not an accumulation of calls.
    fn reschedule(&mut self) {
        match self.state.next_obligation(&self.config) {
            Some((kind, at)) => self.schedule_alarm_at(kind, at),
            None => {
                self.alarm.cancel();
                self.persist_alarm();
            }
        }
    }
}

trait SessionLookupExt {
    fn cloned_user(&self) -> Option<UserId>;
}

impl SessionLookupExt for Option<&diceforge_session::ConnectionSession> {
    fn cloned_user(&self) -> Option<UserId> {
        self.as_ref().map(|s| s.user_id.clone())
    }
}
