//! HTTP + WebSocket router. Ties every layer together: transport →
//! session (auth) → room/lobby actors.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use diceforge_protocol::RoomCode;
use diceforge_room::RoomManager;
use diceforge_session::Authenticator;
use diceforge_transport::{run_lobby_socket, run_room_socket};
use diceforge_lobby::LobbyHandle;
use serde::Serialize;
use serde_json::json;

/// Clients must send this in the `X-Diceforge-Protocol-Version` response
/// header to know which wire shape the server speaks.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
    pub lobby: LobbyHandle,
    pub auth: Arc<dyn Authenticator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lobby/online", get(lobby_online))
        .route("/lobby", get(lobby_upgrade))
        .route("/room/{code}/info", get(room_info))
        .route("/room/{code}", get(room_upgrade))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: u32,
    time: chrono::DateTime<chrono::Utc>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: PROTOCOL_VERSION,
        time: chrono::Utc::now(),
    })
}

async fn lobby_online(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "onlineCount": state.lobby.online_count().await }))
}

async fn room_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<diceforge_protocol::RoomSummary>, StatusCode> {
    let code = RoomCode::parse(&code).ok_or(StatusCode::NOT_FOUND)?;
    let room = state.rooms.get(&code).await.ok_or(StatusCode::NOT_FOUND)?;
    let summary = room.summary().await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(summary))
}

/// Reads the bearer token from `Authorization: Bearer <token>` or a
/// `?token=` query parameter, per distilled §6.
fn extract_bearer_token(headers: &HeaderMap, query: &str) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(text) = value.to_str() {
            if let Some(token) = text.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    for pair in query.split('&') {
        if let Some(token) = pair.strip_prefix("token=") {
            return Some(token.to_string());
        }
    }
    None
}

/// Reads `?public=true|false` off the room upgrade URL — the only knob a
/// client has over the `visibility` the §3 data model lists, since a room
/// is created by the act of someone opening its WebSocket rather than
/// through a dedicated create call. Absent or unparseable leaves the
/// server's configured default in place.
fn extract_visibility(query: &str) -> Option<bool> {
    query.split('&').find_map(|pair| match pair.strip_prefix("public=") {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    })
}

async fn lobby_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::RawQuery(query): axum::extract::RawQuery,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = extract_bearer_token(&headers, query.as_deref().unwrap_or("")) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let user_id = match state.auth.authenticate(&token).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(error = %err, "lobby auth failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let lobby = state.lobby.clone();
    let mut response = ws
        .on_upgrade(move |socket| async move {
            let display_name = user_id.as_str().to_string();
            run_lobby_socket(socket, lobby, user_id, display_name, "default".to_string()).await;
        })
        .into_response();
    response.headers_mut().insert(
        "X-Diceforge-Protocol-Version",
        PROTOCOL_VERSION.to_string().parse().unwrap(),
    );
    response
}

async fn room_upgrade(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    axum::extract::RawQuery(query): axum::extract::RawQuery,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(code) = RoomCode::parse(&code) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(token) = extract_bearer_token(&headers, query.as_deref().unwrap_or("")) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let user_id = match state.auth.authenticate(&token).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(error = %err, "room auth failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let is_public = extract_visibility(query.as_deref().unwrap_or(""));
    let room = state.rooms.get_or_create(code, is_public).await;
    let mut response = ws
        .on_upgrade(move |socket| async move {
            let display_name = user_id.as_str().to_string();
            run_room_socket(socket, room, user_id, display_name, "default".to_string()).await;
        })
        .into_response();
    response.headers_mut().insert(
        "X-Diceforge-Protocol-Version",
        PROTOCOL_VERSION.to_string().parse().unwrap(),
    );
    response
}
