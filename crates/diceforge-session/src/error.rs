//! Error types for the session layer.

use diceforge_protocol::UserId;

/// Errors that can occur during authentication or connection-session
/// management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No bearer token was presented where one is required.
    #[error("missing bearer token")]
    MissingToken,

    /// The token's signature didn't verify against any known key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token verified but its claims are unusable (missing `sub`,
    /// expired past clock-skew tolerance, wrong audience, ...).
    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    /// Fetching or parsing the identity provider's JWKS document failed.
    #[error("jwks error: {0}")]
    Jwks(String),

    /// No connection session exists for the given user.
    #[error("session not found for user {0}")]
    NotFound(UserId),

    /// The reconnection token doesn't match what the server issued, or
    /// names a `userId` different from the one the bearer token resolved.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The session's reconnection grace period has elapsed.
    #[error("session expired for user {0}")]
    SessionExpired(UserId),

    /// The user already has an active (connected) session on this actor.
    #[error("user {0} already has an active session")]
    AlreadyConnected(UserId),
}
