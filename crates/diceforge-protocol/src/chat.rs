//! Chat message shape, reactions, and the rate-limit primitives shared by
//! room chat and lobby chat.
//!
//! Both actors enforce the same numeric thresholds (one chat message per
//! second, one typing indicator per two seconds, at most five reactions
//! per second, 500-character messages, a 30-second shout cooldown with a
//! 5-second shout TTL) so the checking logic lives here once and each
//! actor just threads its own per-user [`RateLimitState`] through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, UserId};

pub const CHAT_MESSAGE_INTERVAL_MS: i64 = 1_000;
pub const TYPING_INTERVAL_MS: i64 = 2_000;
pub const MAX_REACTIONS_PER_SECOND: u32 = 5;
pub const CHAT_MAX_LENGTH: usize = 500;
pub const CHAT_HISTORY_SIZE: usize = 20;
pub const SHOUT_COOLDOWN_MS: i64 = 30_000;
pub const SHOUT_TTL_MS: i64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub author_display_name: String,
    pub content: String,
    pub shout: bool,
    pub sent_at: DateTime<Utc>,
    pub reactions: Vec<ReactionTally>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionTally {
    pub emoji: String,
    pub user_ids: Vec<UserId>,
}

/// Per-user rate-limit bookkeeping. One instance lives per connected user
/// per chat surface (room chat and lobby chat track these independently).
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    last_message_at: Option<DateTime<Utc>>,
    last_typing_at: Option<DateTime<Utc>>,
    last_shout_at: Option<DateTime<Utc>>,
    reaction_window_start: Option<DateTime<Utc>>,
    reaction_count_in_window: u32,
}

/// Outcome of a rate-limit check: either allowed, or rejected with the
/// number of milliseconds the caller should wait before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Reject { remaining_ms: i64 },
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_message(&mut self, now: DateTime<Utc>) -> RateLimitDecision {
        check_interval(&mut self.last_message_at, now, CHAT_MESSAGE_INTERVAL_MS)
    }

    pub fn check_typing(&mut self, now: DateTime<Utc>) -> RateLimitDecision {
        check_interval(&mut self.last_typing_at, now, TYPING_INTERVAL_MS)
    }

    pub fn check_shout(&mut self, now: DateTime<Utc>) -> RateLimitDecision {
        check_interval(&mut self.last_shout_at, now, SHOUT_COOLDOWN_MS)
    }

    pub fn check_reaction(&mut self, now: DateTime<Utc>) -> RateLimitDecision {
        let window_elapsed = self
            .reaction_window_start
            .map(|start| (now - start).num_milliseconds())
            .unwrap_or(1_000);

        if window_elapsed >= 1_000 {
            self.reaction_window_start = Some(now);
            self.reaction_count_in_window = 1;
            return RateLimitDecision::Allow;
        }

        if self.reaction_count_in_window >= MAX_REACTIONS_PER_SECOND {
            return RateLimitDecision::Reject {
                remaining_ms: 1_000 - window_elapsed,
            };
        }

        self.reaction_count_in_window += 1;
        RateLimitDecision::Allow
    }
}

fn check_interval(
    last: &mut Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_ms: i64,
) -> RateLimitDecision {
    if let Some(prev) = *last {
        let elapsed = (now - prev).num_milliseconds();
        if elapsed < interval_ms {
            return RateLimitDecision::Reject {
                remaining_ms: interval_ms - elapsed,
            };
        }
    }
    *last = Some(now);
    RateLimitDecision::Allow
}

/// Validates content length and rejects empty-after-trim messages.
pub fn validate_content(content: &str) -> Result<&str, &'static str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("message is empty");
    }
    if content.len() > CHAT_MAX_LENGTH {
        return Err("message exceeds maximum length");
    }
    Ok(trimmed)
}
