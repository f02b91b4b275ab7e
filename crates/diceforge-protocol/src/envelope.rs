//! The versioned envelope every wire message travels inside.
//!
//! `{ "type": "ROLL_DICE", "payload": { ... }, "timestamp": "..." }`
//!
//! `type` names the message, `payload` is the message-specific body, and
//! `timestamp` is an optional ISO-8601 stamp the sender may attach (the
//! receiver never requires it). Unlike a sequence-numbered envelope, this
//! wire format carries no ordering metadata of its own — ordering is a
//! property of the underlying connection, not the envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw, not-yet-typed envelope as it arrives off the wire.
///
/// Room and lobby messages are decoded from this shape into
/// [`crate::room_messages::RoomClientMessage`] /
/// [`crate::lobby_messages::LobbyClientMessage`] by re-serializing
/// `type`+`payload` into the tagged enum's own representation; see
/// [`crate::codec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Wraps an already-typed, tag+content message into the wire envelope,
/// stamping the current time.
pub fn wrap<T: Serialize>(message_type: &str, payload: &T) -> serde_json::Value {
    serde_json::json!({
        "type": message_type,
        "payload": payload,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_envelope_roundtrip() {
        let raw = RawEnvelope {
            message_type: "CHAT".to_string(),
            payload: serde_json::json!({"content": "hi"}),
            timestamp: None,
        };
        let json = serde_json::to_string(&raw).unwrap();
        assert!(json.contains("\"type\":\"CHAT\""));
        let back: RawEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_type, "CHAT");
    }
}
