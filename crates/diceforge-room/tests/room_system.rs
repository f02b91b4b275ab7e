//! Integration tests driving a `GameRoom` actor through its public
//! `RoomHandle`, the way a connection handler in `diceforge-transport`
//! would.

use std::sync::Arc;

use diceforge_protocol::{RoomClientMessage, RoomCode, RoomServerEvent, UserId};
use diceforge_room::{LobbySink, MemoryStorage, NullLobbySink, RoomConfig, StandardScoring};
use tokio::sync::mpsc;

fn code() -> RoomCode {
    RoomCode::parse("ABC123").unwrap()
}

fn spawn_room() -> diceforge_room::RoomHandle {
    diceforge_room::spawn(
        code(),
        RoomConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(NullLobbySink),
        Arc::new(StandardScoring),
        true,
    )
}

async fn attach(
    handle: &diceforge_room::RoomHandle,
    user: &str,
) -> (UserId, mpsc::UnboundedReceiver<RoomServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let user_id = UserId::from(user);
    handle
        .attach(user_id.clone(), user.to_string(), "seed".to_string(), tx)
        .await
        .expect("attach should succeed");
    (user_id, rx)
}

#[tokio::test]
async fn test_attach_sends_initial_room_state_and_chat_history() {
    let handle = spawn_room();
    let (_user, mut rx) = attach(&handle, "alice").await;

    let first = rx.recv().await.expect("room state");
    assert!(matches!(first, RoomServerEvent::RoomState { .. }));
    let second = rx.recv().await.expect("chat history");
    assert!(matches!(second, RoomServerEvent::ChatHistory { messages } if messages.is_empty()));
}

#[tokio::test]
async fn test_first_player_to_join_becomes_host() {
    let handle = spawn_room();
    let (alice, mut rx) = attach(&handle, "alice").await;
    let _ = rx.recv().await;
    let _ = rx.recv().await;

    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let event = rx.recv().await.expect("room updated");
    match event {
        RoomServerEvent::RoomUpdated { room } => {
            assert_eq!(room.host_user_id, alice);
            assert_eq!(room.players.len(), 1);
            assert!(room.players[0].is_host);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_game_requires_host_and_minimum_players() {
    let handle = spawn_room();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;

    handle.dispatch(alice.clone(), RoomClientMessage::StartGame).await;
    let event = alice_rx.recv().await.expect("error event");
    assert!(matches!(
        event,
        RoomServerEvent::Error { code: diceforge_protocol::ErrorCode::InvalidStatusTransition, .. }
    ));
}

#[tokio::test]
async fn test_non_host_cannot_start_game() {
    let handle = spawn_room();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;

    let (bob, mut bob_rx) = attach(&handle, "bob").await;
    let _ = bob_rx.recv().await;
    let _ = bob_rx.recv().await;
    handle.dispatch(bob.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;
    let _ = bob_rx.recv().await;

    handle.dispatch(bob.clone(), RoomClientMessage::StartGame).await;
    let event = bob_rx.recv().await.expect("error event");
    assert!(matches!(
        event,
        RoomServerEvent::Error { code: diceforge_protocol::ErrorCode::NotHost, .. }
    ));
}

#[tokio::test]
async fn test_chat_message_broadcasts_to_all_connections() {
    let handle = spawn_room();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;

    let (_bob, mut bob_rx) = attach(&handle, "bob").await;
    let _ = bob_rx.recv().await;
    let _ = bob_rx.recv().await;

    handle
        .dispatch(
            alice.clone(),
            RoomClientMessage::Chat { content: "hello".into(), shout: false },
        )
        .await;

    let event = bob_rx.recv().await.expect("chat message relayed");
    assert!(matches!(
        event,
        RoomServerEvent::ChatMessage { message } if message.content == "hello"
    ));
}

#[tokio::test]
async fn test_submit_join_request_is_visible_to_host() {
    let handle = spawn_room();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;

    let view = handle
        .submit_join_request(UserId::from("carol"), "Carol".into(), "seed".into())
        .await
        .expect("join request accepted");
    assert_eq!(view.requester_id, UserId::from("carol"));

    let event = alice_rx.recv().await.expect("join request received");
    assert!(matches!(event, RoomServerEvent::JoinRequestReceived { .. }));
}

#[tokio::test]
async fn test_room_summary_reflects_player_count() {
    let handle = spawn_room();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;

    let summary = handle.summary().await.expect("summary");
    assert_eq!(summary.player_count, 1);
    assert_eq!(summary.code, code());
}

struct RecordingLobbySink {
    upserts: Arc<tokio::sync::Mutex<Vec<diceforge_protocol::RoomSummary>>>,
}

impl LobbySink for RecordingLobbySink {
    fn upsert_room_summary(
        &self,
        summary: diceforge_protocol::RoomSummary,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        let upserts = self.upserts.clone();
        Box::pin(async move {
            upserts.lock().await.push(summary);
        })
    }

    fn remove_room_summary(
        &self,
        _code: RoomCode,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn deliver_join_approved(
        &self,
        _user_id: UserId,
        _code: RoomCode,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn deliver_join_declined(
        &self,
        _user_id: UserId,
        _code: RoomCode,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn release_join_slot(
        &self,
        _user_id: UserId,
        _request_id: diceforge_protocol::JoinRequestId,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn publish_highlight(
        &self,
        _code: RoomCode,
        _text: String,
    ) -> futures_util::future::BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

#[tokio::test]
async fn test_joining_mirrors_a_summary_into_the_lobby_sink() {
    let upserts = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let handle = diceforge_room::spawn(
        code(),
        RoomConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(RecordingLobbySink { upserts: upserts.clone() }),
        Arc::new(StandardScoring),
        true,
    );
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    handle.dispatch(alice.clone(), RoomClientMessage::JoinRoom).await;
    let _ = alice_rx.recv().await;

    for _ in 0..20 {
        if !upserts.lock().await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(upserts.lock().await.len(), 1);
}
