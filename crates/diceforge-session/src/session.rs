//! Session types: the server's record of a connected socket.
//!
//! A "connection session" ties a wire-level [`ConnectionId`] to the
//! [`UserId`] a bearer token resolved to, plus the presentation fields
//! (`displayName`, `avatarSeed`) the client supplied on join. It also
//! carries a reconnection token so a dropped socket can resume the same
//! logical player without re-authenticating.

use std::time::Instant;

use chrono::{DateTime, Utc};
use diceforge_protocol::{ConnectionId, UserId};
use serde::{Deserialize, Serialize};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected socket has to reconnect
    /// before its session is permanently expired. This is the
    /// "host-grace interval" at the connection layer; the room layer
    /// applies its own AFK timers on top of this.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

/// Lifecycle state of a connection session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(timeout)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    Connected,
    Disconnected { since: Instant },
    Expired,
}

/// A single connection's session on the server.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_seed: String,
    pub connected_at: DateTime<Utc>,
    pub state: SessionState,
    pub reconnect_token: String,
}

/// The serializable slice of a [`ConnectionSession`] that gets persisted
/// under the actor's `session_index` key, so a cold-started actor can
/// rebuild its in-memory session map before reconciling against the
/// sockets that are actually still open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndexEntry {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_seed: String,
    pub connected_at: DateTime<Utc>,
}

impl From<&ConnectionSession> for SessionIndexEntry {
    fn from(session: &ConnectionSession) -> Self {
        Self {
            connection_id: session.connection_id,
            user_id: session.user_id.clone(),
            display_name: session.display_name.clone(),
            avatar_seed: session.avatar_seed.clone(),
            connected_at: session.connected_at,
        }
    }
}
