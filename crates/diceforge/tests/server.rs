//! Integration tests for the HTTP + WebSocket router: plain HTTP routes
//! via `tower::ServiceExt::oneshot`, and upgrade round trips via a real
//! `tokio-tungstenite` client against a bound listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use diceforge::{build_router, AppState};
use diceforge_lobby::MemoryStorage as LobbyMemoryStorage;
use diceforge_protocol::{RoomClientMessage, RoomServerEvent};
use diceforge_room::{MemoryStorage as RoomMemoryStorage, RoomManager, RoomStorage, StandardScoring};
use diceforge_session::DevAuthenticator;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_state() -> AppState {
    let room_sink = Arc::new(diceforge::RoomSinkForLobby::new());
    let lobby = diceforge_lobby::spawn(Arc::new(LobbyMemoryStorage::new()), room_sink.clone());
    let rooms = RoomManager::new(
        diceforge_room::RoomConfig::default(),
        Arc::new(|| Arc::new(RoomMemoryStorage::new()) as Arc<dyn RoomStorage>),
        Arc::new(diceforge::LobbySinkForRoom::new(lobby.clone())),
        Arc::new(StandardScoring),
    );
    room_sink.set(rooms.clone());
    AppState { rooms, lobby, auth: Arc::new(DevAuthenticator) }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_lobby_online_starts_at_zero() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/lobby/online").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["onlineCount"], 0);
}

#[tokio::test]
async fn test_room_info_404s_for_unopened_room() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/room/ABC123/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_room_info_404s_for_malformed_code() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/room/not-a-code/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_room_upgrade_without_token_is_unauthorized() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/room/ABC123")
                .header("Connection", "upgrade")
                .header("Upgrade", "websocket")
                .header("Sec-WebSocket-Version", "13")
                .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_room_info_found_after_an_upgrade_creates_it() {
    let state = test_state();
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/room/ABC123?token=u_alice"))
            .await
            .expect("client should connect");
    let _ = futures_util::StreamExt::next(&mut ws).await; // RoomState
    let _ = futures_util::StreamExt::next(&mut ws).await; // ChatHistory

    let app2 = build_router(state);
    let response = app2
        .oneshot(
            Request::builder()
                .uri("/room/ABC123/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], "ABC123");
    assert_eq!(body["playerCount"], 1);
}

#[tokio::test]
async fn test_room_websocket_round_trip_through_the_full_router() {
    let state = test_state();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut ws, response) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/room/ABC123?token=u_bob"))
            .await
            .expect("client should connect");
    assert_eq!(
        response.headers().get("x-diceforge-protocol-version").unwrap(),
        "1"
    );

    let _ = futures_util::StreamExt::next(&mut ws).await; // RoomState
    let _ = futures_util::StreamExt::next(&mut ws).await; // ChatHistory

    let join = serde_json::to_string(&RoomClientMessage::JoinRoom).unwrap();
    futures_util::SinkExt::send(
        &mut ws,
        tokio_tungstenite::tungstenite::Message::Text(join.into()),
    )
    .await
    .unwrap();

    let frame = futures_util::StreamExt::next(&mut ws)
        .await
        .expect("frame")
        .expect("ok frame");
    let tokio_tungstenite::tungstenite::Message::Text(text) = frame else {
        panic!("expected text frame")
    };
    let event: RoomServerEvent = serde_json::from_str(&text).unwrap();
    match event {
        RoomServerEvent::RoomUpdated { room } => assert_eq!(room.players.len(), 1),
        other => panic!("unexpected event: {other:?}"),
    }
}
