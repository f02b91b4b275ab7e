//! WebSocket edge pumps for Diceforge.
//!
//! This crate owns the one place raw frames meet typed actor commands:
//! [`run_room_socket`] and [`run_lobby_socket`] each drive a single
//! `axum` `WebSocket` for the lifetime of one attachment, translating
//! between JSON text frames and the `RoomHandle`/`LobbyHandle` API the
//! `diceforge-room` and `diceforge-lobby` crates expose.

mod error;
mod socket;

pub use error::TransportError;
pub use socket::{
    run_lobby_socket, run_room_socket, HEARTBEAT_INTERVAL, IDLE_TIMEOUT, MAX_MISSED_PONGS,
};
