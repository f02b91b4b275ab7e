//! Single-alarm wall-clock scheduler for Diceforge actors.
//!
//! Every `GameRoom` has at most one pending wall-clock obligation at a
//! time — an AFK warning, an AFK timeout, a room-cleanup sweep, a
//! game-start countdown, or a join-request expiry. Rather than juggling
//! a set of independent timers, the actor holds a single
//! [`AlarmScheduler`] and reschedules it (cancel-then-set) every time an
//! obligation changes. This mirrors the teacher crate's fixed-timestep
//! tick scheduler — a `wait_for_tick`-shaped future meant to sit inside
//! an actor's `tokio::select!` loop — but replaces the periodic-tick
//! model with a single scheduled deadline, because this system has no
//! real-time simulation to step: the only "tick" is "the next thing
//! that's due."
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         kind = scheduler.wait() => { /* the alarm of kind `kind` fired */ }
//!     }
//! }
//! ```
//!
//! # Persistence
//!
//! The scheduler's pending alarm is exposed as an [`AlarmRecord`] — the
//! `{kind, payload, scheduledAt}` shape the distilled spec calls
//! `alarm_data`. The owning actor persists this record before returning
//! control to its event loop, and restores it via [`AlarmScheduler::restore`]
//! on cold start so a recreated actor wakes at the same wall-clock
//! deadline rather than losing the obligation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant as TokioInstant;

/// A single pending alarm: what it's for (`kind`) and when it's due.
///
/// `K` is the actor-specific alarm-kind enum (e.g. a `GameRoom`'s
/// `afk_warning` / `afk_timeout` / `room_cleanup` / `game_start`). This
/// crate doesn't know what the kinds mean — it only ever schedules,
/// cancels, and fires one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRecord<K> {
    pub kind: K,
    pub scheduled_at: DateTime<Utc>,
}

/// Schedules and waits on exactly one pending wall-clock alarm.
///
/// Any call to [`schedule`](Self::schedule) first discards whatever
/// alarm was previously pending — there is no queue. This matches the
/// "next wake is always the minimum of all pending obligations; when one
/// fires, the actor recomputes the next" rule: the actor, not this
/// scheduler, is responsible for deciding which obligation currently
/// deserves the single slot.
pub struct AlarmScheduler<K> {
    record: Option<AlarmRecord<K>>,
    deadline: Option<TokioInstant>,
}

impl<K: Clone> AlarmScheduler<K> {
    pub fn new() -> Self {
        Self {
            record: None,
            deadline: None,
        }
    }

    /// Schedules a new alarm, discarding any alarm previously pending.
    pub fn schedule(&mut self, kind: K, at: DateTime<Utc>) -> AlarmRecord<K> {
        let record = AlarmRecord {
            kind,
            scheduled_at: at,
        };
        self.deadline = Some(deadline_from(at));
        self.record = Some(record.clone());
        record
    }

    /// Cancels the pending alarm, if any. A no-op if nothing is pending.
    pub fn cancel(&mut self) {
        self.record = None;
        self.deadline = None;
    }

    /// The currently pending alarm, if any — what gets persisted as
    /// `alarm_data`.
    pub fn pending(&self) -> Option<&AlarmRecord<K>> {
        self.record.as_ref()
    }

    /// Restores a pending alarm loaded from persisted `alarm_data` after
    /// a cold start. The deadline is recomputed from `scheduled_at`
    /// against wall-clock now — if the actor was gone past the original
    /// deadline, the alarm fires on the next `wait()` almost immediately
    /// rather than being silently dropped.
    pub fn restore(&mut self, record: Option<AlarmRecord<K>>) {
        match record {
            Some(record) => {
                self.deadline = Some(deadline_from(record.scheduled_at));
                self.record = Some(record);
            }
            None => self.cancel(),
        }
    }

    /// Waits until the pending alarm is due and returns its kind.
    ///
    /// Pends forever when nothing is scheduled — correct inside
    /// `tokio::select!`, where the other branches keep driving the
    /// actor's command loop.
    pub async fn wait(&mut self) -> K {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        tokio::time::sleep_until(deadline).await;
        let record = self.record.take().expect("deadline implies a record");
        self.deadline = None;
        record.kind
    }

    pub fn is_pending(&self) -> bool {
        self.record.is_some()
    }
}

impl<K: Clone> Default for AlarmScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn deadline_from(at: DateTime<Utc>) -> TokioInstant {
    let now = Utc::now();
    let delay = (at - now).to_std().unwrap_or(std::time::Duration::ZERO);
    TokioInstant::now() + delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Kind {
        Warning,
        Timeout,
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_pends_forever_with_nothing_scheduled() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        assert!(!scheduler.is_pending());
        tokio::select! {
            _ = scheduler.wait() => panic!("should never fire"),
            _ = tokio::time::sleep(std::time::Duration::from_secs(10)) => {}
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_at_deadline() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        let now = Utc::now();
        scheduler.schedule(Kind::Warning, now + ChronoDuration::seconds(5));

        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        let kind = scheduler.wait().await;
        assert_eq!(kind, Kind::Warning);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test]
    async fn test_rescheduling_discards_prior_alarm() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        let now = Utc::now();
        scheduler.schedule(Kind::Warning, now + ChronoDuration::seconds(30));
        scheduler.schedule(Kind::Timeout, now + ChronoDuration::milliseconds(10));

        let kind = scheduler.wait().await;
        assert_eq!(kind, Kind::Timeout);
    }

    #[test]
    fn test_cancel_clears_pending() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        scheduler.schedule(Kind::Warning, Utc::now() + ChronoDuration::seconds(1));
        assert!(scheduler.is_pending());
        scheduler.cancel();
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_restore_recomputes_deadline_from_record() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        let record = AlarmRecord {
            kind: Kind::Timeout,
            scheduled_at: Utc::now() - ChronoDuration::seconds(5),
        };
        scheduler.restore(Some(record));
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_restore_none_cancels() {
        let mut scheduler: AlarmScheduler<Kind> = AlarmScheduler::new();
        scheduler.schedule(Kind::Warning, Utc::now() + ChronoDuration::seconds(1));
        scheduler.restore(None);
        assert!(!scheduler.is_pending());
    }
}
