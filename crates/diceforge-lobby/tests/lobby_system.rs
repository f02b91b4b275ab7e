//! Integration tests driving a `GlobalLobby` actor through its public
//! `LobbyHandle`.

use std::sync::Arc;

use diceforge_lobby::{MemoryStorage, NullRoomSink, RoomSink};
use diceforge_protocol::{
    derive_room_identity, JoinRequestId, LobbyClientMessage, LobbyServerEvent, RoomCode,
    RoomDirectoryUpdate, RoomStatus, RoomSummary, UserId,
};
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

fn spawn_lobby() -> diceforge_lobby::LobbyHandle {
    diceforge_lobby::spawn(Arc::new(MemoryStorage::new()), Arc::new(NullRoomSink))
}

async fn attach(
    handle: &diceforge_lobby::LobbyHandle,
    user: &str,
) -> (UserId, mpsc::UnboundedReceiver<LobbyServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let user_id = UserId::from(user);
    handle
        .attach(user_id.clone(), user.to_string(), "seed".to_string(), tx)
        .await
        .expect("attach should succeed");
    (user_id, rx)
}

fn summary(code: &str) -> RoomSummary {
    let code = RoomCode::parse(code).unwrap();
    RoomSummary {
        identity: derive_room_identity(&code),
        code,
        host_display_name: "Host".into(),
        player_count: 1,
        max_players: 6,
        spectator_count: 0,
        is_public: true,
        status: RoomStatus::Waiting,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn test_attach_sends_rooms_list_and_chat_history() {
    let handle = spawn_lobby();
    let (_user, mut rx) = attach(&handle, "alice").await;
    let first = rx.recv().await.expect("rooms list");
    assert!(matches!(first, LobbyServerEvent::LobbyRoomsList { .. }));
    let second = rx.recv().await.expect("chat history");
    assert!(matches!(second, LobbyServerEvent::LobbyChatHistory { messages } if messages.is_empty()));
}

#[tokio::test]
async fn test_second_attach_notifies_existing_connections_of_presence() {
    let handle = spawn_lobby();
    let (_alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;

    let (_bob, _bob_rx) = attach(&handle, "bob").await;
    let event = alice_rx.recv().await.expect("presence join");
    match event {
        LobbyServerEvent::PresenceJoin { user } => assert_eq!(user.user_id, UserId::from("bob")),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_directory_update_broadcasts_room_upsert() {
    let handle = spawn_lobby();
    let (_alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;

    handle
        .apply_directory_update(RoomDirectoryUpdate::Upsert(summary("ABC123")))
        .await;

    let event = alice_rx.recv().await.expect("room update");
    assert!(matches!(event, LobbyServerEvent::LobbyRoomUpdate { room } if room.code.as_str() == "ABC123"));
}

#[tokio::test]
async fn test_lobby_chat_broadcasts_to_all_connections() {
    let handle = spawn_lobby();
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    let (_bob, mut bob_rx) = attach(&handle, "bob").await;
    let _ = bob_rx.recv().await;
    let _ = bob_rx.recv().await;
    let _ = alice_rx.recv().await; // presence join for bob

    handle
        .dispatch(alice.clone(), LobbyClientMessage::Chat { content: "hi all".into() })
        .await;

    let event = bob_rx.recv().await.expect("chat relayed");
    assert!(matches!(event, LobbyServerEvent::LobbyChatMessage { message } if message.content == "hi all"));
}

struct AcceptingRoomSink;

impl RoomSink for AcceptingRoomSink {
    fn submit_join_request(
        &self,
        _room_code: RoomCode,
        _requester: UserId,
        _display_name: String,
        _avatar_seed: String,
    ) -> BoxFuture<'static, Result<JoinRequestId, String>> {
        Box::pin(async { Ok(JoinRequestId::new()) })
    }

    fn cancel_join_request(&self, _room_code: RoomCode, _requester: UserId) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

#[tokio::test]
async fn test_request_join_forwards_to_room_sink_and_confirms() {
    let handle = diceforge_lobby::spawn(Arc::new(MemoryStorage::new()), Arc::new(AcceptingRoomSink));
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;

    let room_code = RoomCode::parse("ABC123").unwrap();
    handle
        .dispatch(alice.clone(), LobbyClientMessage::RequestJoin { room_code: room_code.clone() })
        .await;

    let event = alice_rx.recv().await.expect("join request sent");
    assert!(matches!(event, LobbyServerEvent::JoinRequestSent { room_code: rc, .. } if rc == room_code));
}

#[tokio::test]
async fn test_duplicate_join_request_is_rejected() {
    let handle = diceforge_lobby::spawn(Arc::new(MemoryStorage::new()), Arc::new(AcceptingRoomSink));
    let (alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;

    let room_code = RoomCode::parse("ABC123").unwrap();
    handle
        .dispatch(alice.clone(), LobbyClientMessage::RequestJoin { room_code: room_code.clone() })
        .await;
    let _ = alice_rx.recv().await;

    handle
        .dispatch(alice.clone(), LobbyClientMessage::RequestJoin { room_code })
        .await;
    let event = alice_rx.recv().await.expect("error event");
    assert!(matches!(
        event,
        LobbyServerEvent::Error { code: diceforge_protocol::ErrorCode::DuplicateRequest, .. }
    ));
}

#[tokio::test]
async fn test_online_count_tracks_connected_sessions() {
    let handle = spawn_lobby();
    assert_eq!(handle.online_count().await, 0);

    let (_alice, mut alice_rx) = attach(&handle, "alice").await;
    let _ = alice_rx.recv().await;
    let _ = alice_rx.recv().await;
    assert_eq!(handle.online_count().await, 1);

    let (_bob, mut bob_rx) = attach(&handle, "bob").await;
    let _ = bob_rx.recv().await;
    let _ = bob_rx.recv().await;
    assert_eq!(handle.online_count().await, 2);
}
