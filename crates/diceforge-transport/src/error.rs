//! Errors that can occur while pumping a single WebSocket connection.
//!
//! These never reach the client directly — a pump either closes the
//! socket with an appropriate close code or just stops, logging the
//! reason. They exist so the edge router can distinguish "the peer hung
//! up" from "we rejected the attach" when deciding what, if anything, to
//! log at what level.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The room or lobby actor refused the attach (room full, duplicate
    /// session, actor unavailable).
    #[error("attach rejected: {0}")]
    AttachRejected(String),
}
