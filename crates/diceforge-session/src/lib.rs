//! Connection session management for Diceforge.
//!
//! This crate handles the lifecycle of a socket's attachment to a player
//! identity:
//!
//! 1. **Authentication** — validating the bearer token a socket presents
//!    ([`Authenticator`], [`JwksAuthenticator`])
//! 2. **Session tracking** — knowing who's connected to which actor
//!    ([`SessionManager`])
//! 3. **Reconnection** — letting a dropped socket resume the same
//!    logical session within the grace period
//! 4. **Cold-start restore** — rebuilding the session map from a
//!    persisted `session_index` after a hibernated actor wakes
//!
//! # How it fits in the stack
//!
//! ```text
//! Room / Lobby actor (above)  ← uses sessions to know who is in the room
//!     ↕
//! Session layer (this crate)  ← manages identity and connection state
//!     ↕
//! Protocol layer (below)      ← provides UserId, ConnectionId types
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, DevAuthenticator, JwksAuthenticator, CLOCK_SKEW_TOLERANCE_SECONDS};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{ConnectionSession, SessionConfig, SessionIndexEntry, SessionState};
