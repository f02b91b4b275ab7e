//! Unified error type for the `diceforge` binary.

use diceforge_lobby::LobbyError;
use diceforge_protocol::ProtocolError;
use diceforge_room::RoomError;
use diceforge_session::SessionError;

/// Top-level error that wraps every sub-crate's own error type.
///
/// HTTP handlers and upgrade entry points deal in this single type via
/// `?` instead of importing each sub-crate's error separately — the
/// `#[from]` attribute on each variant auto-generates the conversion.
#[derive(Debug, thiserror::Error)]
pub enum DiceforgeError {
    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, reconnect, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid state).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A lobby-level error (unavailable, unknown request).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// An invalid room code in a URL path segment.
    #[error("invalid room code: {0}")]
    BadRoomCode(String),

    /// No `Authorization: Bearer <token>` header, or it was malformed.
    #[error("missing or malformed bearer token")]
    MissingToken,
}
