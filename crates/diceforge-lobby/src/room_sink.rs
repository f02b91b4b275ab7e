//! The lobby's address for a room — the symmetric counterpart to
//! `diceforge_room::LobbySink`.
//!
//! `diceforge-lobby` has no dependency on `diceforge-room`; it only
//! knows this trait. The binary crate that wires both actors together
//! implements `RoomSink` for its concrete room-manager handle and hands
//! an `Arc<dyn RoomSink>` to the `GlobalLobby`.

use diceforge_protocol::{JoinRequestId, RoomCode, UserId};
use futures_util::future::BoxFuture;

pub trait RoomSink: Send + Sync + 'static {
    /// Forwards a `REQUEST_JOIN` to the named room. The room mints the
    /// `JoinRequestId` and is the source of truth for whether the
    /// request is accepted (room exists, has space, no duplicate).
    fn submit_join_request(
        &self,
        room_code: RoomCode,
        requester: UserId,
        display_name: String,
        avatar_seed: String,
    ) -> BoxFuture<'static, Result<JoinRequestId, String>>;

    /// Forwards a `CANCEL_JOIN_REQUEST` to the room that holds it.
    fn cancel_join_request(
        &self,
        room_code: RoomCode,
        requester: UserId,
    ) -> BoxFuture<'static, ()>;
}

/// A `RoomSink` that rejects every submission. Used when a `GlobalLobby`
/// is run standalone (e.g. in a unit test) with no rooms to route to.
pub struct NullRoomSink;

impl RoomSink for NullRoomSink {
    fn submit_join_request(
        &self,
        _room_code: RoomCode,
        _requester: UserId,
        _display_name: String,
        _avatar_seed: String,
    ) -> BoxFuture<'static, Result<JoinRequestId, String>> {
        Box::pin(async { Err("no rooms available".to_string()) })
    }

    fn cancel_join_request(
        &self,
        _room_code: RoomCode,
        _requester: UserId,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}
