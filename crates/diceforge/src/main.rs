//! Server entry point: loads configuration, wires the room and lobby
//! actors together, and starts serving HTTP + WebSocket traffic.

use std::sync::Arc;

use diceforge::{build_router, AppState, Config, LobbySinkForRoom, RoomSinkForLobby};
use diceforge_lobby::MemoryStorage as LobbyMemoryStorage;
use diceforge_room::{MemoryStorage as RoomMemoryStorage, RoomManager, StandardScoring};
use diceforge_session::{Authenticator, DevAuthenticator, JwksAuthenticator};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("diceforge=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    // `GlobalLobby` and `RoomManager` each need to address the other at
    // construction time. The lobby side can be built immediately since
    // `diceforge_lobby::spawn` only takes a trait object; the room side
    // of that trait object is filled in once `RoomManager` itself
    // exists, synchronously, before the listener starts accepting
    // connections below.
    let room_sink_for_lobby = Arc::new(RoomSinkForLobby::new());
    let lobby = diceforge_lobby::spawn(
        Arc::new(LobbyMemoryStorage::new()),
        room_sink_for_lobby.clone(),
    );

    let rooms = RoomManager::new(
        config.room.clone(),
        Arc::new(|| Arc::new(RoomMemoryStorage::new()) as Arc<dyn diceforge_room::RoomStorage>),
        Arc::new(LobbySinkForRoom::new(lobby.clone())),
        Arc::new(StandardScoring),
    );
    room_sink_for_lobby.set(rooms.clone());

    let auth: Arc<dyn Authenticator> = match &config.identity_provider_jwks_url {
        Some(jwks_url) => {
            let mut authenticator =
                JwksAuthenticator::new(jwks_url.clone(), config.identity_provider_audience.clone());
            if let Some(secret) = &config.legacy_shared_secret {
                authenticator = authenticator.with_legacy_shared_secret(secret.clone());
            }
            Arc::new(authenticator)
        }
        None => {
            tracing::warn!("IDENTITY_PROVIDER_JWKS_URL unset, falling back to DevAuthenticator");
            Arc::new(DevAuthenticator)
        }
    };

    let app = build_router(AppState { rooms, lobby, auth });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "diceforge listening");
    axum::serve(listener, app).await?;

    Ok(())
}
