//! Error types for the protocol layer.
//!
//! Each crate defines its own error enum scoped to its layer. A
//! `ProtocolError` means the problem is in decoding the wire envelope or
//! in the shape of a message, not in room/lobby state or networking.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope decoded fine but named a `type` this surface doesn't
    /// recognize, or the payload didn't match the shape the type implies.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Client-visible error codes, grouped by the error-handling taxonomy:
/// validation, authorization, state, rate, auth, transport, and internal.
///
/// These are what actually reaches the client inside an `ERROR` event's
/// payload — `ProtocolError`/`RoomError`/`LobbyError`/etc. are internal
/// and get mapped down to one of these before they cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    InvalidMessage,
    TooLong,
    InvalidCategory,
    BadRoomCode,
    // Authorization
    NotHost,
    NotYourTurn,
    NotRequester,
    // State
    RoomFull,
    AlreadyScored,
    NoRolls,
    DuplicateRequest,
    Expired,
    InvalidStatusTransition,
    MessageNotFound,
    // Rate
    RateLimited,
    // Auth
    MissingToken,
    InvalidSignature,
    InvalidClaims,
    JwksError,
    // Transport
    ProtocolMismatch,
    HeartbeatTimeout,
    // Internal
    InternalError,
}

impl ErrorCode {
    /// The taxonomy kind this code belongs to, per the error-handling
    /// design: used to pick an HTTP status on pre-upgrade rejection and
    /// to decide whether a condition is worth an `error`-level log.
    pub fn kind(self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            InvalidMessage | TooLong | InvalidCategory | BadRoomCode => ErrorKind::Validation,
            NotHost | NotYourTurn | NotRequester => ErrorKind::Authorization,
            RoomFull | AlreadyScored | NoRolls | DuplicateRequest | Expired
            | InvalidStatusTransition | MessageNotFound => ErrorKind::State,
            RateLimited => ErrorKind::Rate,
            MissingToken | InvalidSignature | InvalidClaims | JwksError => ErrorKind::Auth,
            ProtocolMismatch | HeartbeatTimeout => ErrorKind::Transport,
            InternalError => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    State,
    Rate,
    Auth,
    Transport,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_kinds() {
        assert_eq!(ErrorCode::RoomFull.kind(), ErrorKind::State);
        assert_eq!(ErrorCode::RateLimited.kind(), ErrorKind::Rate);
        assert_eq!(ErrorCode::InternalError.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::NotYourTurn).unwrap();
        assert_eq!(json, "\"NOT_YOUR_TURN\"");
    }
}
