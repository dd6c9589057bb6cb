//! Integration tests for the periodic timer.
//!
//! Uses `tokio::time::pause()` (via `start_paused`) so the clock is
//! controlled deterministically — `sleep_until` resolves instantly when
//! the runtime auto-advances time, making minute-scale intervals testable
//! in milliseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agora_timer::{spawn_periodic, PeriodicTimer, TimerConfig};

fn config_60s() -> TimerConfig {
    TimerConfig::with_interval(Duration::from_secs(60))
}

// =========================================================================
// PeriodicTimer
// =========================================================================

#[test]
fn test_timer_initial_state() {
    // Needs a runtime only for `Instant::now`; a current-thread one is fine.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    rt.block_on(async {
        let timer = PeriodicTimer::new(config_60s());
        assert_eq!(timer.tick_count(), 0);
        assert!(!timer.is_paused());
        assert_eq!(timer.interval(), Duration::from_secs(60));
    });
}

#[tokio::test(start_paused = true)]
async fn test_wait_fires_and_increments() {
    let mut timer = PeriodicTimer::new(config_60s());

    let info = timer.wait().await;
    assert_eq!(info.tick, 1);
    assert!(!info.overdue);
    assert_eq!(timer.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_multiple_fires_increment_monotonically() {
    let mut timer = PeriodicTimer::new(config_60s());

    for expected in 1..=4 {
        let info = timer.wait().await;
        assert_eq!(info.tick, expected);
    }
    assert_eq!(timer.tick_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_paused_timer_never_fires() {
    let mut timer = PeriodicTimer::new(config_60s());
    timer.pause();
    assert!(timer.is_paused());

    // With the clock paused, the timeout auto-advances while wait() pends
    // forever — so the timeout must win.
    let result =
        tokio::time::timeout(Duration::from_secs(3600), timer.wait()).await;
    assert!(result.is_err(), "paused timer must not fire");
    assert_eq!(timer.tick_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_rearms_from_now() {
    let mut timer = PeriodicTimer::new(config_60s());
    timer.pause();
    // A long paused stretch must not produce a burst on resume.
    tokio::time::advance(Duration::from_secs(600)).await;
    timer.resume();
    assert!(!timer.is_paused());

    let info = timer.wait().await;
    assert_eq!(info.tick, 1, "exactly one fire after resume, no catch-up");
}

#[tokio::test(start_paused = true)]
async fn test_pause_is_idempotent() {
    let mut timer = PeriodicTimer::new(config_60s());
    timer.pause();
    timer.pause();
    assert!(timer.is_paused());
    timer.resume();
    timer.resume();
    assert!(!timer.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_missed_deadline_reschedules_from_now() {
    let mut timer = PeriodicTimer::new(config_60s());

    // First fire at t=60.
    timer.wait().await;

    // Simulate a long suspension: jump far past the next deadline.
    tokio::time::advance(Duration::from_secs(500)).await;

    let info = timer.wait().await;
    assert!(info.overdue, "late fire should be flagged overdue");
    assert_eq!(info.tick, 2, "no catch-up fires for the missed window");
}

// =========================================================================
// spawn_periodic / TaskHandle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawn_periodic_runs_on_interval() {
    let count = Arc::new(AtomicU64::new(0));
    let counted = Arc::clone(&count);

    let handle = spawn_periodic(config_60s(), move |_info| {
        let counted = Arc::clone(&counted);
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Let several virtual intervals elapse.
    tokio::time::sleep(Duration::from_secs(185)).await;
    let fired = count.load(Ordering::SeqCst);
    assert!((2..=4).contains(&fired), "expected ~3 fires, got {fired}");

    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_the_task() {
    let count = Arc::new(AtomicU64::new(0));
    let counted = Arc::clone(&count);

    let handle = spawn_periodic(config_60s(), move |_info| {
        let counted = Arc::clone(&counted);
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
        }
    });

    tokio::time::sleep(Duration::from_secs(65)).await;
    handle.cancel();
    // Give the abort a chance to land before sampling.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let at_cancel = count.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(
        count.load(Ordering::SeqCst),
        at_cancel,
        "no fires after cancel"
    );
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_the_task() {
    let count = Arc::new(AtomicU64::new(0));
    let counted = Arc::clone(&count);

    let handle = spawn_periodic(config_60s(), move |_info| {
        let counted = Arc::clone(&counted);
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
        }
    });

    tokio::time::sleep(Duration::from_secs(65)).await;
    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let at_drop = count.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(
        count.load(Ordering::SeqCst),
        at_drop,
        "dropping the handle must cancel the task"
    );
}
