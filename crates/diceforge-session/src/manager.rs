//! The session manager: tracks every connected socket for one actor
//! (a `GameRoom` or the `GlobalLobby`).
//!
//! Responsible for:
//! - Creating sessions when a socket presents a valid bearer token
//! - Tracking which users are connected/disconnected
//! - Validating reconnection tokens
//! - Expiring sessions after the grace period
//! - Serializing/restoring the `session_index` so a hibernated actor
//!   can rebuild its session map on cold start
//!
//! `SessionManager` is not thread-safe by itself — it's owned by the
//! single task running the actor's message loop.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use diceforge_protocol::{ConnectionId, UserId};
use rand::Rng;

use crate::{ConnectionSession, SessionConfig, SessionError, SessionIndexEntry, SessionState};

pub struct SessionManager {
    /// Active sessions, keyed by user id — a user has at most one
    /// connected or disconnected-but-in-grace session per actor.
    sessions: HashMap<UserId, ConnectionSession>,
    /// Reconnection tokens to user ids, kept in sync with `sessions`.
    tokens: HashMap<String, UserId>,
    /// Connection id to user id, for routing inbound frames back to a
    /// session without scanning.
    by_connection: HashMap<ConnectionId, UserId>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            by_connection: HashMap::new(),
            config,
        }
    }

    /// Creates a new session after successful authentication.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the user already has an
    /// active (Connected) session on this actor.
    pub fn create(
        &mut self,
        user_id: UserId,
        display_name: String,
        avatar_seed: String,
    ) -> Result<&ConnectionSession, SessionError> {
        if let Some(existing) = self.sessions.get(&user_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(user_id));
            }
            self.tokens.remove(&existing.reconnect_token);
            self.by_connection.remove(&existing.connection_id);
        }

        let token = generate_token();
        let connection_id = ConnectionId::new();

        let session = ConnectionSession {
            connection_id,
            user_id: user_id.clone(),
            display_name,
            avatar_seed,
            connected_at: Utc::now(),
            state: SessionState::Connected,
            reconnect_token: token.clone(),
        };

        self.tokens.insert(token, user_id.clone());
        self.by_connection.insert(connection_id, user_id.clone());
        self.sessions.insert(user_id.clone(), session);

        tracing::info!(%user_id, %connection_id, "session created");

        Ok(self.sessions.get(&user_id).expect("just inserted"))
    }

    /// Marks a user as disconnected. Starts the reconnection grace period.
    pub fn disconnect(&mut self, user_id: &UserId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.clone()))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%user_id, "disconnected, grace period started");
        Ok(())
    }

    /// Reconnects using a previously issued token, attaching a fresh
    /// connection id (the underlying socket is new even though the
    /// logical session is the same).
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token not recognized
    /// - [`SessionError::SessionExpired`] — grace period elapsed
    /// - [`SessionError::AlreadyConnected`] — session was never
    ///   disconnected in the first place
    pub fn reconnect(
        &mut self,
        token: &str,
        new_connection_id: ConnectionId,
    ) -> Result<&ConnectionSession, SessionError> {
        let user_id = self
            .tokens
            .get(token)
            .cloned()
            .ok_or(SessionError::InvalidToken)?;

        let session = self
            .sessions
            .get_mut(&user_id)
            .ok_or(SessionError::InvalidToken)?;

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace = Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(user_id));
                }
                self.by_connection.remove(&session.connection_id);
                session.connection_id = new_connection_id;
                session.state = SessionState::Connected;
                self.by_connection.insert(new_connection_id, user_id.clone());
                tracing::info!(%user_id, %new_connection_id, "reconnected");
                Ok(self.sessions.get(&user_id).expect("just modified"))
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(user_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(user_id)),
        }
    }

    /// Scans for disconnected sessions past their grace period and marks
    /// them expired. Returns the affected user ids.
    pub fn expire_stale(&mut self) -> Vec<UserId> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.user_id.clone());
                    tracing::info!(user_id = %session.user_id, "session expired");
                }
            }
        }

        expired
    }

    /// Removes expired sessions from all indexes.
    pub fn cleanup_expired(&mut self) {
        let by_connection = &mut self.by_connection;
        let tokens = &mut self.tokens;
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                tokens.remove(&session.reconnect_token);
                by_connection.remove(&session.connection_id);
                false
            } else {
                true
            }
        });
    }

    pub fn get(&self, user_id: &UserId) -> Option<&ConnectionSession> {
        self.sessions.get(user_id)
    }

    pub fn get_by_connection(&self, connection_id: &ConnectionId) -> Option<&ConnectionSession> {
        self.by_connection
            .get(connection_id)
            .and_then(|user_id| self.sessions.get(user_id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Count of sessions with at least one connected socket right now —
    /// the "online" figure, as distinct from [`len`](Self::len) which
    /// also counts sessions still inside their reconnect grace period.
    pub fn online_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|session| matches!(session.state, SessionState::Connected))
            .count()
    }

    /// Snapshot suitable for the `session_index` persisted key.
    pub fn session_index(&self) -> Vec<SessionIndexEntry> {
        self.sessions.values().map(SessionIndexEntry::from).collect()
    }

    /// Rebuilds in-memory session state from a persisted `session_index`
    /// after a cold start. Every restored session starts `Disconnected`
    /// with `since` set to now — the caller must reconcile against the
    /// sockets that are actually open (by presenting reconnect tokens or
    /// re-authenticating) before treating any of them as live again.
    pub fn restore(&mut self, entries: Vec<SessionIndexEntry>) {
        for entry in entries {
            let token = generate_token();
            self.by_connection.insert(entry.connection_id, entry.user_id.clone());
            self.tokens.insert(token.clone(), entry.user_id.clone());
            self.sessions.insert(
                entry.user_id.clone(),
                ConnectionSession {
                    connection_id: entry.connection_id,
                    user_id: entry.user_id,
                    display_name: entry.display_name,
                    avatar_seed: entry.avatar_seed,
                    connected_at: entry.connected_at,
                    state: SessionState::Disconnected {
                        since: Instant::now(),
                    },
                    reconnect_token: token,
                },
            );
        }
    }
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_instant_expiry() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 0,
        })
    }

    fn manager_with_long_grace() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
        })
    }

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    #[test]
    fn test_create_new_user_returns_connected_session() {
        let mut mgr = manager_with_long_grace();
        let session = mgr
            .create(uid("u1"), "Alice".to_string(), "seed-1".to_string())
            .expect("should succeed");
        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.user_id, uid("u1"));
        assert_eq!(session.reconnect_token.len(), 32);
    }

    #[test]
    fn test_create_already_connected_returns_error() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap();
        let result = mgr.create(uid("u1"), "Alice".to_string(), "seed".to_string());
        assert!(matches!(result, Err(SessionError::AlreadyConnected(u)) if u == uid("u1")));
    }

    #[test]
    fn test_disconnect_then_reconnect_restores_connected() {
        let mut mgr = manager_with_long_grace();
        let token = mgr
            .create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap()
            .reconnect_token
            .clone();
        mgr.disconnect(&uid("u1")).unwrap();

        let new_conn = ConnectionId::new();
        let session = mgr.reconnect(&token, new_conn).expect("should succeed");
        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.connection_id, new_conn);
    }

    #[test]
    fn test_reconnect_after_grace_period_expires() {
        let mut mgr = manager_with_instant_expiry();
        let token = mgr
            .create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap()
            .reconnect_token
            .clone();
        mgr.disconnect(&uid("u1")).unwrap();

        let result = mgr.reconnect(&token, ConnectionId::new());
        assert!(matches!(result, Err(SessionError::SessionExpired(u)) if u == uid("u1")));
    }

    #[test]
    fn test_expire_stale_and_cleanup() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap();
        mgr.disconnect(&uid("u1")).unwrap();

        let expired = mgr.expire_stale();
        assert_eq!(expired, vec![uid("u1")]);
        assert_eq!(mgr.len(), 1);

        mgr.cleanup_expired();
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_session_index_roundtrip_restore() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap();
        let index = mgr.session_index();
        assert_eq!(index.len(), 1);

        let mut restored = SessionManager::new(SessionConfig::default());
        restored.restore(index);
        let session = restored.get(&uid("u1")).expect("restored");
        assert!(matches!(session.state, SessionState::Disconnected { .. }));
    }

    #[test]
    fn test_online_count_excludes_disconnected_sessions() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1"), "Alice".to_string(), "seed".to_string())
            .unwrap();
        mgr.create(uid("u2"), "Bob".to_string(), "seed".to_string())
            .unwrap();
        assert_eq!(mgr.online_count(), 2);

        mgr.disconnect(&uid("u1")).unwrap();
        assert_eq!(mgr.online_count(), 1);
        assert_eq!(mgr.len(), 2);
    }
}
