//! Error types for the lobby layer.

use diceforge_protocol::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("message too long")]
    TooLong,

    #[error("rate limited, retry in {remaining_ms}ms")]
    RateLimited { remaining_ms: u64 },

    #[error("you already have a pending join request")]
    DuplicateRequest,

    #[error("no such join request")]
    NotFound,

    #[error("unknown room code")]
    BadRoomCode,

    #[error("the lobby is unavailable")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl LobbyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LobbyError::TooLong => ErrorCode::TooLong,
            LobbyError::RateLimited { .. } => ErrorCode::RateLimited,
            LobbyError::DuplicateRequest => ErrorCode::DuplicateRequest,
            LobbyError::NotFound => ErrorCode::Expired,
            LobbyError::BadRoomCode => ErrorCode::BadRoomCode,
            LobbyError::Unavailable => ErrorCode::InternalError,
            LobbyError::Internal(_) => ErrorCode::InternalError,
        }
    }
}
