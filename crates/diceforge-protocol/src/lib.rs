//! Wire protocol for Diceforge.
//!
//! This crate defines the "language" room and lobby connections speak:
//!
//! - **Identifiers** ([`ids`]) — `UserId`, `RoomCode`, `ConnectionId`, and
//!   the rest of the newtypes keyed across actor state.
//! - **Envelope** ([`envelope`]) — the `{type, payload, timestamp?}`
//!   shape every message rides inside.
//! - **Message catalogs** ([`room_messages`], [`lobby_messages`]) — the
//!   concrete client→server commands and server→client events for each
//!   actor surface.
//! - **Chat** ([`chat`]) — message/reaction shapes and the rate-limit
//!   primitives both surfaces enforce identically.
//! - **Codec** ([`codec`]) — how messages are turned to/from bytes.
//! - **Errors** ([`error`]) — `ProtocolError` plus the client-visible
//!   `ErrorCode` taxonomy.
//!
//! The protocol layer sits below session, room, and lobby; it has no
//! dependency on any of them. It only knows how to name things and how
//! to serialize them.

mod category;
mod chat;
mod codec;
mod envelope;
mod error;
mod ids;
mod lobby_messages;
mod room_messages;

pub use category::Category;
pub use chat::{
    validate_content, ChatMessage, RateLimitDecision, RateLimitState, ReactionTally,
    CHAT_HISTORY_SIZE, CHAT_MAX_LENGTH, CHAT_MESSAGE_INTERVAL_MS, MAX_REACTIONS_PER_SECOND,
    SHOUT_COOLDOWN_MS, SHOUT_TTL_MS, TYPING_INTERVAL_MS,
};
pub use codec::{Codec, JsonCodec};
pub use envelope::{wrap, RawEnvelope};
pub use error::{ErrorCode, ErrorKind, ProtocolError};
pub use ids::{ConnectionId, JoinRequestId, MessageId, RoomCode, UserId};
pub use lobby_messages::{
    derive_room_identity, LobbyClientMessage, LobbyServerEvent, PresenceView, RoomDirectoryUpdate,
    RoomIdentity, RoomStatus, RoomSummary,
};
pub use room_messages::{
    JoinRequestView, Phase, PlayerType, PlayerView, RankingEntry, RoomClientMessage,
    RoomConfigView, RoomServerEvent, RoomStateView, ScorecardEntry,
};
