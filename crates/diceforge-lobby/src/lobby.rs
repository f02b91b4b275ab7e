//! `GlobalLobby`: the single, server-wide actor handling presence, the
//! public room directory, lobby chat, and join-request routing.
//!
//! Unlike `GameRoom`, there is exactly one of these per server process —
//! no `RoomCode` key, no `RoomManager`. It mirrors the room actor's
//! shape (mpsc command channel, cloneable handle) but has no alarm of
//! its own: its only wall-clock obligation (join-request expiry) is
//! owned and scheduled by the room that received the request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use diceforge_protocol::{
    ChatMessage, ConnectionId, JoinRequestId, LobbyClientMessage, LobbyServerEvent, MessageId,
    PresenceView, RateLimitState, RoomCode, RoomDirectoryUpdate, UserId, CHAT_HISTORY_SIZE,
};
use diceforge_session::{SessionConfig, SessionManager};
use tokio::sync::{mpsc, oneshot};

use crate::error::LobbyError;
use crate::model::{LobbyState, PendingJoinRequest};
use crate::room_sink::RoomSink;
use crate::storage::LobbyStorage;

pub type OutboundSender = mpsc::UnboundedSender<LobbyServerEvent>;

enum LobbyCommand {
    Attach {
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<ConnectionId, LobbyError>>,
    },
    Detach {
        connection_id: ConnectionId,
    },
    Client {
        user_id: UserId,
        message: LobbyClientMessage,
    },
    DirectoryUpdate(RoomDirectoryUpdate),
    DeliverJoinApproved {
        user_id: UserId,
        room_code: RoomCode,
    },
    DeliverJoinDeclined {
        user_id: UserId,
        room_code: RoomCode,
    },
    ReleaseJoinSlot {
        request_id: JoinRequestId,
    },
    PublishHighlight {
        room_code: RoomCode,
        text: String,
    },
    OnlineCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Cheap-to-clone handle to the running `GlobalLobby` actor.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
}

const COMMAND_CHANNEL_SIZE: usize = 256;

impl LobbyHandle {
    pub async fn attach(
        &self,
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
    ) -> Result<ConnectionId, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(LobbyCommand::Attach { user_id, display_name, avatar_seed, outbound, reply })
            .await
            .map_err(|_| LobbyError::Unavailable)?;
        rx.await.map_err(|_| LobbyError::Unavailable)?
    }

    pub async fn detach(&self, connection_id: ConnectionId) {
        let _ = self.sender.send(LobbyCommand::Detach { connection_id }).await;
    }

    pub async fn dispatch(&self, user_id: UserId, message: LobbyClientMessage) {
        let _ = self.sender.send(LobbyCommand::Client { user_id, message }).await;
    }

    pub async fn apply_directory_update(&self, update: RoomDirectoryUpdate) {
        let _ = self.sender.send(LobbyCommand::DirectoryUpdate(update)).await;
    }

    pub async fn deliver_join_approved(&self, user_id: UserId, room_code: RoomCode) {
        let _ = self
            .sender
            .send(LobbyCommand::DeliverJoinApproved { user_id, room_code })
            .await;
    }

    pub async fn deliver_join_declined(&self, user_id: UserId, room_code: RoomCode) {
        let _ = self
            .sender
            .send(LobbyCommand::DeliverJoinDeclined { user_id, room_code })
            .await;
    }

    pub async fn release_join_slot(&self, request_id: JoinRequestId) {
        let _ = self.sender.send(LobbyCommand::ReleaseJoinSlot { request_id }).await;
    }

    pub async fn publish_highlight(&self, room_code: RoomCode, text: String) {
        let _ = self
            .sender
            .send(LobbyCommand::PublishHighlight { room_code, text })
            .await;
    }

    /// The `/lobby/online` figure: sessions with at least one connected
    /// socket right now.
    pub async fn online_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(LobbyCommand::OnlineCount { reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

struct LobbyActor {
    state: LobbyState,
    storage: Arc<dyn LobbyStorage>,
    rooms: Arc<dyn RoomSink>,
    sessions: SessionManager,
    connections: HashMap<ConnectionId, OutboundSender>,
    rate_limits: HashMap<UserId, RateLimitState>,
    typing_limits: HashMap<UserId, RateLimitState>,
}

/// Spawns the singleton `GlobalLobby` actor with no persisted state to
/// restore.
pub fn spawn(storage: Arc<dyn LobbyStorage>, rooms: Arc<dyn RoomSink>) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let actor = LobbyActor {
        state: LobbyState::new(),
        storage,
        rooms,
        sessions: SessionManager::new(SessionConfig { reconnect_grace_secs: 30 }),
        connections: HashMap::new(),
        rate_limits: HashMap::new(),
        typing_limits: HashMap::new(),
    };
    tokio::spawn(actor.run(rx));
    LobbyHandle { sender: tx }
}

/// Spawns the lobby recreated from persisted state — the hibernation
/// wakeup path, mirroring `diceforge_room::spawn_restoring`.
pub async fn spawn_restoring(storage: Arc<dyn LobbyStorage>, rooms: Arc<dyn RoomSink>) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let state = storage.load_lobby_state().await.unwrap_or_default();
    let mut sessions = SessionManager::new(SessionConfig { reconnect_grace_secs: 30 });
    sessions.restore(storage.load_session_index().await);
    let actor = LobbyActor {
        state,
        storage,
        rooms,
        sessions,
        connections: HashMap::new(),
        rate_limits: HashMap::new(),
        typing_limits: HashMap::new(),
    };
    tokio::spawn(actor.run(rx));
    LobbyHandle { sender: tx }
}

impl LobbyActor {
    async fn run(mut self, mut receiver: mpsc::Receiver<LobbyCommand>) {
        tracing::info!("lobby actor started");
        while let Some(cmd) = receiver.recv().await {
            self.handle_command(cmd).await;
        }
        tracing::info!("lobby actor stopped");
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::Attach { user_id, display_name, avatar_seed, outbound, reply } => {
                let result = self.handle_attach(user_id, display_name, avatar_seed, outbound);
                self.persist_sessions();
                let _ = reply.send(result);
            }
            LobbyCommand::Detach { connection_id } => {
                self.handle_detach(connection_id);
                self.persist_sessions();
            }
            LobbyCommand::Client { user_id, message } => {
                self.handle_client_message(user_id, message).await;
            }
            LobbyCommand::DirectoryUpdate(update) => {
                self.handle_directory_update(update).await;
            }
            LobbyCommand::DeliverJoinApproved { user_id, room_code } => {
                self.send_to_user(&user_id, LobbyServerEvent::JoinApproved { room_code });
            }
            LobbyCommand::DeliverJoinDeclined { user_id, room_code } => {
                self.send_to_user(&user_id, LobbyServerEvent::JoinRequestDeclined { room_code });
            }
            LobbyCommand::ReleaseJoinSlot { request_id } => {
                self.state.pending_join_requests.remove(&request_id);
                self.persist_state().await;
            }
            LobbyCommand::PublishHighlight { room_code, text } => {
                self.broadcast(LobbyServerEvent::LobbyHighlight { room_code, text });
            }
            LobbyCommand::OnlineCount { reply } => {
                let _ = reply.send(self.sessions.online_count());
            }
        }
    }

    fn handle_attach(
        &mut self,
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
        outbound: OutboundSender,
    ) -> Result<ConnectionId, LobbyError> {
        let session = self
            .sessions
            .create(user_id.clone(), display_name.clone(), avatar_seed.clone())
            .map_err(|e| LobbyError::Internal(e.to_string()))?;
        let connection_id = session.connection_id;
        self.connections.insert(connection_id, outbound.clone());

        let _ = outbound.send(LobbyServerEvent::LobbyRoomsList { rooms: self.state.rooms_list() });
        let _ = outbound.send(LobbyServerEvent::LobbyChatHistory {
            messages: self.state.chat.iter().cloned().collect(),
        });

        self.broadcast_except(
            connection_id,
            LobbyServerEvent::PresenceJoin {
                user: PresenceView { user_id: user_id.clone(), display_name, avatar_seed },
            },
        );
        Ok(connection_id)
    }

    fn handle_detach(&mut self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        let Some(user_id) = self
            .sessions
            .get_by_connection(&connection_id)
            .map(|s| s.user_id.clone())
        else {
            return;
        };
        let _ = self.sessions.disconnect(&user_id);
        self.broadcast(LobbyServerEvent::PresenceLeave { user_id });
    }

    async fn handle_client_message(&mut self, user_id: UserId, message: LobbyClientMessage) {
        let result = match message {
            LobbyClientMessage::RequestJoin { room_code } => {
                self.on_request_join(&user_id, room_code).await
            }
            LobbyClientMessage::CancelJoinRequest { request_id } => {
                self.on_cancel_join_request(&user_id, request_id).await;
                Ok(())
            }
            LobbyClientMessage::Chat { content } => self.on_chat(&user_id, content).await,
            LobbyClientMessage::TypingStart => self.on_typing(&user_id, true),
            LobbyClientMessage::TypingStop => self.on_typing(&user_id, false),
        };
        if let Err(err) = result {
            self.send_to_user(
                &user_id,
                LobbyServerEvent::Error { code: err.code(), message: err.to_string() },
            );
        }
    }

    async fn on_request_join(&mut self, user_id: &UserId, room_code: RoomCode) -> Result<(), LobbyError> {
        if self.state.pending_for_user(user_id).is_some() {
            return Err(LobbyError::DuplicateRequest);
        }
        let session = self.sessions.get(user_id).ok_or(LobbyError::Internal("no session".into()))?;
        let display_name = session.display_name.clone();
        let avatar_seed = session.avatar_seed.clone();

        let request_id = self
            .rooms
            .submit_join_request(room_code.clone(), user_id.clone(), display_name, avatar_seed)
            .await
            .map_err(|_| LobbyError::BadRoomCode)?;

        self.state.pending_join_requests.insert(
            request_id,
            PendingJoinRequest {
                id: request_id,
                requester: user_id.clone(),
                room_code: room_code.clone(),
                created_at: Utc::now(),
            },
        );
        self.persist_state().await;
        self.send_to_user(user_id, LobbyServerEvent::JoinRequestSent { request_id, room_code });
        Ok(())
    }

    async fn on_cancel_join_request(&mut self, user_id: &UserId, request_id: JoinRequestId) {
        let Some(request) = self.state.pending_join_requests.remove(&request_id) else {
            return;
        };
        if &request.requester != user_id {
            self.state.pending_join_requests.insert(request_id, request);
            return;
        }
        self.rooms.cancel_join_request(request.room_code, user_id.clone()).await;
        self.persist_state().await;
        self.send_to_user(user_id, LobbyServerEvent::JoinRequestCancelled { request_id });
    }

    async fn on_chat(&mut self, user_id: &UserId, content: String) -> Result<(), LobbyError> {
        let trimmed = diceforge_protocol::validate_content(&content)
            .map_err(|_| LobbyError::TooLong)?
            .to_string();
        let now = Utc::now();
        let limiter = self.rate_limits.entry(user_id.clone()).or_default();
        if let diceforge_protocol::RateLimitDecision::Reject { remaining_ms } = limiter.check_message(now) {
            return Err(LobbyError::RateLimited { remaining_ms: remaining_ms as u64 });
        }
        let display_name = self
            .sessions
            .get(user_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| user_id.to_string());
        let message = ChatMessage {
            id: MessageId::new(),
            author_id: user_id.clone(),
            author_display_name: display_name,
            content: trimmed,
            shout: false,
            sent_at: now,
            reactions: Vec::new(),
        };
        if self.state.chat.len() >= CHAT_HISTORY_SIZE {
            self.state.chat.pop_front();
        }
        self.state.chat.push_back(message.clone());
        self.persist_state().await;
        self.broadcast(LobbyServerEvent::LobbyChatMessage { message });
        Ok(())
    }

    fn on_typing(&mut self, user_id: &UserId, is_typing: bool) -> Result<(), LobbyError> {
        if is_typing {
            let now = Utc::now();
            let limiter = self.typing_limits.entry(user_id.clone()).or_default();
            if let diceforge_protocol::RateLimitDecision::Reject { .. } = limiter.check_typing(now) {
                return Ok(());
            }
        }
        self.broadcast(LobbyServerEvent::TypingIndicator { user_id: user_id.clone(), is_typing });
        Ok(())
    }

    /// §4.3: upserts persist before any broadcast goes out.
    async fn handle_directory_update(&mut self, update: RoomDirectoryUpdate) {
        match update {
            RoomDirectoryUpdate::Upsert(summary) => {
                let code = summary.code.clone();
                let is_public = summary.is_public;
                self.state.directory.insert(code, summary.clone());
                self.persist_state().await;
                // Private rooms still live in the directory (for a
                // future direct-by-code lookup) but must never reach a
                // lobby-connected client via this live update either —
                // `rooms_list()` already keeps them out of the initial
                // snapshot.
                if is_public {
                    self.broadcast(LobbyServerEvent::LobbyRoomUpdate { room: summary });
                }
            }
            RoomDirectoryUpdate::Remove(code) => {
                self.state.directory.remove(&code);
                self.persist_state().await;
                self.broadcast(LobbyServerEvent::LobbyRoomRemoved { code });
            }
        }
    }

    fn broadcast(&self, event: LobbyServerEvent) {
        for outbound in self.connections.values() {
            let _ = outbound.send(event.clone());
        }
    }

    fn broadcast_except(&self, except: ConnectionId, event: LobbyServerEvent) {
        for (connection_id, outbound) in &self.connections {
            if *connection_id != except {
                let _ = outbound.send(event.clone());
            }
        }
    }

    fn send_to_user(&self, user_id: &UserId, event: LobbyServerEvent) {
        if let Some(session) = self.sessions.get(user_id) {
            if let Some(outbound) = self.connections.get(&session.connection_id) {
                let _ = outbound.send(event);
            }
        }
    }

    async fn persist_state(&self) {
        self.storage.save_lobby_state(self.state.clone()).await;
    }

    fn persist_sessions(&self) {
        let storage = self.storage.clone();
        let entries = self.sessions.session_index();
        tokio::spawn(async move { storage.save_session_index(entries).await });
    }
}
