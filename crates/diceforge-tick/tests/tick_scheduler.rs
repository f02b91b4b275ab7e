//! Integration tests for the single-alarm scheduler, using
//! `tokio::time::pause()`/`advance()` for deterministic timing instead of
//! real sleeps.

use chrono::{Duration as ChronoDuration, Utc};
use diceforge_tick::AlarmScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlarmKind {
    AfkWarning,
    AfkTimeout,
    RoomCleanup,
    GameStart,
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_alarm_fires_after_advancing_time() {
    let mut scheduler: AlarmScheduler<AlarmKind> = AlarmScheduler::new();
    scheduler.schedule(AlarmKind::GameStart, Utc::now() + ChronoDuration::seconds(3));

    tokio::time::advance(std::time::Duration::from_secs(3)).await;
    assert_eq!(scheduler.wait().await, AlarmKind::GameStart);
}

#[tokio::test(start_paused = true)]
async fn test_only_one_alarm_pending_at_a_time() {
    let mut scheduler: AlarmScheduler<AlarmKind> = AlarmScheduler::new();
    scheduler.schedule(AlarmKind::AfkWarning, Utc::now() + ChronoDuration::seconds(20));
    assert!(scheduler.is_pending());

    // Rescheduling (as the turn machine does on every roll) discards the
    // warning in favor of whatever comes next.
    scheduler.schedule(AlarmKind::AfkTimeout, Utc::now() + ChronoDuration::seconds(10));

    tokio::time::advance(std::time::Duration::from_secs(10)).await;
    assert_eq!(scheduler.wait().await, AlarmKind::AfkTimeout);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_reschedule() {
    let mut scheduler: AlarmScheduler<AlarmKind> = AlarmScheduler::new();
    scheduler.schedule(AlarmKind::RoomCleanup, Utc::now() + ChronoDuration::seconds(300));
    scheduler.cancel();
    assert!(!scheduler.is_pending());

    scheduler.schedule(AlarmKind::AfkWarning, Utc::now() + ChronoDuration::seconds(1));
    tokio::time::advance(std::time::Duration::from_secs(1)).await;
    assert_eq!(scheduler.wait().await, AlarmKind::AfkWarning);
}

#[tokio::test]
async fn test_restore_from_persisted_record_in_the_past_fires_immediately() {
    let mut scheduler: AlarmScheduler<AlarmKind> = AlarmScheduler::new();
    let record = diceforge_tick::AlarmRecord {
        kind: AlarmKind::AfkTimeout,
        scheduled_at: Utc::now() - ChronoDuration::seconds(5),
    };
    scheduler.restore(Some(record));

    let fired = tokio::time::timeout(std::time::Duration::from_millis(200), scheduler.wait())
        .await
        .expect("alarm overdue at restore time should fire immediately");
    assert_eq!(fired, AlarmKind::AfkTimeout);
}

#[tokio::test]
async fn test_wait_with_nothing_pending_never_resolves_within_budget() {
    let mut scheduler: AlarmScheduler<AlarmKind> = AlarmScheduler::new();
    let result = tokio::time::timeout(std::time::Duration::from_millis(50), scheduler.wait()).await;
    assert!(result.is_err(), "wait() should not resolve with nothing scheduled");
}
