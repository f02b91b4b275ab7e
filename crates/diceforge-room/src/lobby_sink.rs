//! The room's address for the lobby — never a reference to the lobby
//! itself.
//!
//! Per the distilled spec's design notes, "the lobby knows rooms, rooms
//! know the lobby" cyclic references are broken by replacing them with
//! addresses: each side holds only the other's key, and communication is
//! an explicit typed call. `diceforge-room` has no dependency on
//! `diceforge-lobby` — it only knows this trait. The binary crate that
//! wires both actors together implements `LobbySink` for its concrete
//! lobby handle and hands an `Arc<dyn LobbySink>` to every `GameRoom`.

use diceforge_protocol::{JoinRequestId, RoomCode, RoomSummary, UserId};
use futures_util::future::BoxFuture;

pub trait LobbySink: Send + Sync + 'static {
    /// Mirrors a room-summary change into the lobby's public directory.
    /// Must be called after the room's own `game_state` write commits.
    fn upsert_room_summary(&self, summary: RoomSummary) -> BoxFuture<'static, ()>;

    /// Removes a room from the public directory (room closed or emptied
    /// past cleanup).
    fn remove_room_summary(&self, code: RoomCode) -> BoxFuture<'static, ()>;

    /// Tells the lobby to deliver `JOIN_APPROVED` to the requester's
    /// lobby socket, if still connected there.
    fn deliver_join_approved(&self, user_id: UserId, code: RoomCode) -> BoxFuture<'static, ()>;

    /// Tells the lobby to deliver `JOIN_REQUEST_DECLINED` (or an
    /// expiry notice, which uses the same event) to the requester.
    fn deliver_join_declined(&self, user_id: UserId, code: RoomCode) -> BoxFuture<'static, ()>;

    /// Releases the lobby's "one pending join request per user" slot
    /// once the room resolves (approves, declines, or expires) a
    /// request — called regardless of outcome.
    fn release_join_slot(&self, user_id: UserId, request_id: JoinRequestId) -> BoxFuture<'static, ()>;

    /// A cross-room highlight, throttled by the room itself to at most
    /// one per 500ms before it ever reaches this call.
    fn publish_highlight(&self, code: RoomCode, text: String) -> BoxFuture<'static, ()>;
}

/// A `LobbySink` that drops every call. Used when a `GameRoom` is run
/// standalone (e.g. in a unit test) with no lobby to report to.
pub struct NullLobbySink;

impl LobbySink for NullLobbySink {
    fn upsert_room_summary(&self, _summary: RoomSummary) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn remove_room_summary(&self, _code: RoomCode) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn deliver_join_approved(&self, _user_id: UserId, _code: RoomCode) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn deliver_join_declined(&self, _user_id: UserId, _code: RoomCode) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn release_join_slot(
        &self,
        _user_id: UserId,
        _request_id: JoinRequestId,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn publish_highlight(&self, _code: RoomCode, _text: String) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}
