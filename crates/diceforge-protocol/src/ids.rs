//! Identifiers that travel on the wire and key actor state.
//!
//! Unlike a numeric-room framework, every identifier here is either an
//! opaque string handed to us by an external system (the user id from the
//! identity provider) or a short human-facing code (the room code). Both
//! are newtype-wrapped so a `UserId` can never be passed where a `RoomCode`
//! is expected, even though both are strings underneath.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of a human or AI player, issued by the identity provider.
///
/// `#[serde(transparent)]` makes `UserId("u_abc")` serialize as the bare
/// string `"u_abc"`, matching what the identity provider's claims contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A six-character room code, always stored canonically upper-cased.
///
/// Construction goes through [`RoomCode::parse`], which is the single
/// place the `^[A-Z0-9]{6}$` grammar is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    const LEN: usize = 6;

    /// Upper-cases `raw` and validates it against the room-code grammar.
    ///
    /// Returns `None` if the upper-cased value isn't exactly six
    /// characters from `A-Z0-9`. Callers that hit `None` should respond
    /// with a 404 / `BAD_ROOM_CODE`, not a validation error — an
    /// unparsable code names no room.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.to_ascii_uppercase();
        if upper.len() == Self::LEN
            && upper.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            Some(Self(upper))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection identifier, minted by the accepting actor when a socket
/// attaches (never chosen by the client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identifier for a pending join request, minted by the owning GameRoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinRequestId(pub uuid::Uuid);

impl JoinRequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JoinRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JoinRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jr-{}", self.0)
    }
}

/// Identifier for a single chat message, used as the target of reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub uuid::Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_parse_uppercases() {
        let code = RoomCode::parse("abc012").expect("valid grammar");
        assert_eq!(code.as_str(), "ABC012");
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!(RoomCode::parse("abc").is_none());
        assert!(RoomCode::parse("abcdefg").is_none());
    }

    #[test]
    fn test_room_code_parse_rejects_non_alphanumeric() {
        assert!(RoomCode::parse("abc-12").is_none());
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::from("u_alice")).unwrap();
        assert_eq!(json, "\"u_alice\"");
    }

    #[test]
    fn test_connection_id_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
