//! Pumps a single accepted `axum` WebSocket for the lifetime of one
//! attached connection.
//!
//! Both `GameRoom` and `GlobalLobby` actors speak in typed events over an
//! unbounded channel, not raw bytes — a pump's job is purely at the edge:
//! turn outbound events into text frames, turn inbound text frames into
//! typed commands, enforce the heartbeat and frame-validity rules, and
//! call `attach`/`detach` around the actor's view of the connection.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use diceforge_lobby::LobbyHandle;
use diceforge_protocol::{
    ErrorCode, LobbyClientMessage, LobbyServerEvent, RoomClientMessage, RoomServerEvent, UserId,
};
use diceforge_room::RoomHandle;

/// Server ping cadence (distilled spec §4.2).
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Consecutive unanswered pings before the socket is closed with 1011.
pub const MAX_MISSED_PONGS: u32 = 2;
/// Idle-read backstop independent of the heartbeat counter (§5).
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(90);
/// Malformed/binary frames allowed before the socket is closed for abuse (§7).
const MAX_INVALID_FRAMES: u32 = 5;
const INVALID_FRAME_WINDOW: Duration = Duration::from_secs(10);

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

/// Counts frame-level violations (bad JSON, unrecognized shape, binary
/// frames) in a rolling 10s window, per §7's "close on repeated abuse".
struct AbuseTracker {
    count: u32,
    window_start: Instant,
}

impl AbuseTracker {
    fn new() -> Self {
        Self { count: 0, window_start: Instant::now() }
    }

    /// Records one violation, returning `true` once the threshold for the
    /// current window has been crossed.
    fn strike(&mut self) -> bool {
        if self.window_start.elapsed() > INVALID_FRAME_WINDOW {
            self.count = 0;
            self.window_start = Instant::now();
        }
        self.count += 1;
        self.count >= MAX_INVALID_FRAMES
    }
}

/// Heartbeat bookkeeping shared by both pumps.
struct Heartbeat {
    missed: u32,
}

impl Heartbeat {
    fn new() -> Self {
        Self { missed: 0 }
    }

    fn on_pong(&mut self) {
        self.missed = 0;
    }

    /// Called on every ping tick, before the next ping goes out. Returns
    /// `true` once the peer has missed [`MAX_MISSED_PONGS`] in a row.
    fn tick(&mut self) -> bool {
        if self.missed >= MAX_MISSED_PONGS {
            return true;
        }
        self.missed += 1;
        false
    }
}

/// Drives one WebSocket for the lifetime of a `GameRoom` attachment.
/// Returns once the socket closes, the peer is unresponsive, or the room
/// rejects the attach — `detach` is always called on the way out except
/// when attach itself failed.
pub async fn run_room_socket(
    socket: WebSocket,
    room: RoomHandle,
    user_id: UserId,
    display_name: String,
    avatar_seed: String,
) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<RoomServerEvent>();

    let connection_id = match room.attach(user_id.clone(), display_name, avatar_seed, outbound_tx).await {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "room attach rejected");
            let _ = sink.send(close_frame(1011, "attach rejected")).await;
            return;
        }
    };

    let mut heartbeat = Heartbeat::new();
    let mut abuse = AbuseTracker::new();
    let mut last_activity = Instant::now();
    let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping_interval.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = Instant::now();
                        match serde_json::from_str::<RoomClientMessage>(&text) {
                            Ok(message) => room.dispatch(user_id.clone(), message).await,
                            Err(err) => {
                                tracing::debug!(user_id = %user_id, error = %err, "unrecognized room frame");
                                let _ = sink.send(Message::Text(
                                    serde_json::to_string(&RoomServerEvent::Error {
                                        code: ErrorCode::InvalidMessage,
                                        message: "could not parse message".to_string(),
                                    })
                                    .expect("RoomServerEvent always serializes")
                                    .into(),
                                )).await;
                                if abuse.strike() {
                                    let _ = sink.send(close_frame(1003, "too many invalid frames")).await;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(user_id = %user_id, "binary frame rejected");
                        if abuse.strike() {
                            let _ = sink.send(close_frame(1003, "binary frames are not supported")).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                        heartbeat.on_pong();
                    }
                    Some(Ok(Message::Ping(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(user_id = %user_id, error = %err, "room socket error");
                        break;
                    }
                }
            }
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let text = serde_json::to_string(&event).expect("RoomServerEvent always serializes");
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    tracing::info!(user_id = %user_id, "room socket idle timeout");
                    let _ = sink.send(close_frame(1011, "idle timeout")).await;
                    break;
                }
                if heartbeat.tick() {
                    tracing::info!(user_id = %user_id, "room socket missed heartbeat");
                    let _ = sink.send(close_frame(1011, "heartbeat timeout")).await;
                    break;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    room.detach(connection_id).await;
}

/// Drives one WebSocket for the lifetime of a `GlobalLobby` attachment.
/// Mirrors [`run_room_socket`] exactly except for the handle and message
/// types — the lobby has no alarm of its own, but a socket still needs
/// the same heartbeat and frame-validity policing.
pub async fn run_lobby_socket(
    socket: WebSocket,
    lobby: LobbyHandle,
    user_id: UserId,
    display_name: String,
    avatar_seed: String,
) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<LobbyServerEvent>();

    let connection_id = match lobby.attach(user_id.clone(), display_name, avatar_seed, outbound_tx).await {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "lobby attach rejected");
            let _ = sink.send(close_frame(1011, "attach rejected")).await;
            return;
        }
    };

    let mut heartbeat = Heartbeat::new();
    let mut abuse = AbuseTracker::new();
    let mut last_activity = Instant::now();
    let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = Instant::now();
                        match serde_json::from_str::<LobbyClientMessage>(&text) {
                            Ok(message) => lobby.dispatch(user_id.clone(), message).await,
                            Err(err) => {
                                tracing::debug!(user_id = %user_id, error = %err, "unrecognized lobby frame");
                                let _ = sink.send(Message::Text(
                                    serde_json::to_string(&LobbyServerEvent::Error {
                                        code: ErrorCode::InvalidMessage,
                                        message: "could not parse message".to_string(),
                                    })
                                    .expect("LobbyServerEvent always serializes")
                                    .into(),
                                )).await;
                                if abuse.strike() {
                                    let _ = sink.send(close_frame(1003, "too many invalid frames")).await;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(user_id = %user_id, "binary frame rejected");
                        if abuse.strike() {
                            let _ = sink.send(close_frame(1003, "binary frames are not supported")).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                        heartbeat.on_pong();
                    }
                    Some(Ok(Message::Ping(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(user_id = %user_id, error = %err, "lobby socket error");
                        break;
                    }
                }
            }
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let text = serde_json::to_string(&event).expect("LobbyServerEvent always serializes");
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    tracing::info!(user_id = %user_id, "lobby socket idle timeout");
                    let _ = sink.send(close_frame(1011, "idle timeout")).await;
                    break;
                }
                if heartbeat.tick() {
                    tracing::info!(user_id = %user_id, "lobby socket missed heartbeat");
                    let _ = sink.send(close_frame(1011, "heartbeat timeout")).await;
                    break;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    lobby.detach(connection_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_closes_after_two_missed_pongs() {
        let mut hb = Heartbeat::new();
        assert!(!hb.tick());
        assert!(hb.tick());
    }

    #[test]
    fn test_heartbeat_resets_on_pong() {
        let mut hb = Heartbeat::new();
        assert!(!hb.tick());
        hb.on_pong();
        assert!(!hb.tick());
        assert!(hb.tick());
    }

    #[test]
    fn test_abuse_tracker_trips_at_threshold() {
        let mut tracker = AbuseTracker::new();
        for _ in 0..MAX_INVALID_FRAMES - 1 {
            assert!(!tracker.strike());
        }
        assert!(tracker.strike());
    }
}
