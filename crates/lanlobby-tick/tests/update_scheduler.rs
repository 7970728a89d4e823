//! Integration tests for the update-loop scheduler.
//!
//! Uses paused tokio time so deadlines resolve as soon as the runtime
//! advances the clock.

use std::time::Duration;

use lanlobby_tick::{UpdateConfig, UpdateScheduler};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn no_jitter(interval_ms: u64) -> UpdateConfig {
    UpdateConfig {
        initial_jitter_ms: 0,
        ..UpdateConfig::with_interval(interval_ms)
    }
}

// =========================================================================
// UpdateConfig
// =========================================================================

#[test]
fn test_default_interval_is_200ms() {
    let cfg = UpdateConfig::default();
    assert_eq!(cfg.interval(), Duration::from_millis(200));
}

#[test]
fn test_validated_clamps_interval() {
    assert_eq!(UpdateConfig::with_interval(0).validated().interval_ms, 10);
    assert_eq!(
        UpdateConfig::with_interval(60_000).validated().interval_ms,
        10_000
    );
    let cfg = UpdateConfig {
        budget_warn_threshold: 3.0,
        ..UpdateConfig::default()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_updates_fire_on_interval() {
    let start = Instant::now();
    let mut s = UpdateScheduler::new(no_jitter(200));

    for expected in 1..=3 {
        let info = s.wait_for_update().await;
        assert_eq!(info.number, expected);
        assert!(!info.late);
    }
    assert_eq!(Instant::now() - start, Duration::from_millis(600));
    assert_eq!(s.update_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_only_delays_first_update() {
    let start = Instant::now();
    let mut s = UpdateScheduler::new(UpdateConfig {
        initial_jitter_ms: 50,
        ..UpdateConfig::with_interval(100)
    });
    s.wait_for_update().await;
    let first = Instant::now() - start;
    assert!(first >= Duration::from_millis(100) && first < Duration::from_millis(150));

    s.wait_for_update().await;
    assert_eq!(Instant::now() - start - first, Duration::from_millis(100));
}

// =========================================================================
// Falling behind
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_late_wakeup_counts_missed_and_restarts_from_now() {
    let mut s = UpdateScheduler::new(no_jitter(200));
    tokio::time::advance(Duration::from_millis(650)).await;

    let info = s.wait_for_update().await;
    assert!(info.late);
    assert_eq!(info.missed, 2);

    let before = Instant::now();
    s.wait_for_update().await;
    assert_eq!(Instant::now() - before, Duration::from_millis(200));
    assert_eq!(s.update_count(), 2);
}

// =========================================================================
// Update work
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_update_does_not_shift_next_wakeup() {
    let start = Instant::now();
    let mut s = UpdateScheduler::new(no_jitter(200));
    s.record_update_end(); // nothing started, no-op

    s.wait_for_update().await;
    tokio::time::advance(Duration::from_millis(150)).await;
    s.record_update_end();

    let info = s.wait_for_update().await;
    assert_eq!(info.number, 2);
    assert!(!info.late);
    assert_eq!(Instant::now() - start, Duration::from_millis(400));
}

// =========================================================================
// Integration: select! loop pattern
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut s = UpdateScheduler::new(no_jitter(200));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        tx.send("stop").await.ok();
    });

    let mut updates = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = s.wait_for_update() => {
                updates += 1;
                s.record_update_end();
                assert_eq!(info.number, updates);
            }
        }
    }
    assert_eq!(updates, 3);
}
