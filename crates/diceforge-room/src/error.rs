//! Error types for the room layer.

use diceforge_protocol::{ErrorCode, RoomCode};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("only the host may perform this action")]
    NotHost,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("this join request does not belong to you")]
    NotRequester,

    #[error("category already scored")]
    AlreadyScored,

    #[error("no rolls remaining this turn")]
    NoRolls,

    #[error("duplicate request")]
    DuplicateRequest,

    #[error("join request expired")]
    Expired,

    #[error("invalid state transition: {0}")]
    InvalidStatusTransition(String),

    #[error("rate limited, retry in {remaining_ms}ms")]
    RateLimited { remaining_ms: u64 },

    #[error("message too long")]
    TooLong,

    #[error("unknown category")]
    InvalidCategory,

    #[error("message not found")]
    MessageNotFound,

    #[error("not enough players to start")]
    NotEnoughPlayers,

    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::NotFound(_) => ErrorCode::BadRoomCode,
            RoomError::RoomFull(_) => ErrorCode::RoomFull,
            RoomError::NotHost => ErrorCode::NotHost,
            RoomError::NotYourTurn => ErrorCode::NotYourTurn,
            RoomError::NotRequester => ErrorCode::NotRequester,
            RoomError::AlreadyScored => ErrorCode::AlreadyScored,
            RoomError::NoRolls => ErrorCode::NoRolls,
            RoomError::DuplicateRequest => ErrorCode::DuplicateRequest,
            RoomError::Expired => ErrorCode::Expired,
            RoomError::InvalidStatusTransition(_) => ErrorCode::InvalidStatusTransition,
            RoomError::RateLimited { .. } => ErrorCode::RateLimited,
            RoomError::TooLong => ErrorCode::TooLong,
            RoomError::InvalidCategory => ErrorCode::InvalidCategory,
            RoomError::MessageNotFound => ErrorCode::MessageNotFound,
            RoomError::NotEnoughPlayers => ErrorCode::InvalidStatusTransition,
            RoomError::Unavailable(_) => ErrorCode::InternalError,
            RoomError::Internal(_) => ErrorCode::InternalError,
        }
    }
}
