//! Periodic background scheduler for Agora.
//!
//! Drives recurring maintenance work — the token refresh check above all —
//! on a fixed interval measured in minutes, not frames. Two pieces:
//!
//! - [`PeriodicTimer`] — an awaitable fixed-interval clock with
//!   pause/resume, for callers that own their loop.
//! - [`spawn_periodic`] — runs a closure on the interval inside a
//!   background task and returns a [`TaskHandle`] that cancels it. The
//!   handle cancels on drop, so an owning scope that goes away takes its
//!   timer with it.
//!
//! A missed deadline (laptop lid closed, tab frozen) reschedules from *now*
//! rather than replaying missed fires — one refresh check is as good as
//! three.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a periodic timer.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How often the timer fires.
    pub interval: Duration,
    /// Random delay (0–max) added to the *first* fire only. Spreads a fleet
    /// of clients that all reloaded after a deploy, so they don't hit the
    /// refresh endpoint in the same second.
    pub initial_jitter: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(180),
            initial_jitter: Duration::from_secs(15),
        }
    }
}

impl TimerConfig {
    /// Shortest supported interval.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a config with the given interval and no jitter.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            initial_jitter: Duration::ZERO,
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PeriodicTimer::new`]. An interval below
    /// [`Self::MIN_INTERVAL`] is raised to it — a sub-second poll against
    /// an auth endpoint is always a configuration mistake.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "timer interval below minimum — clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

/// Information about a fire of the timer, returned by [`PeriodicTimer::wait`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing fire number (starts at 1).
    pub tick: u64,
    /// `true` if this fire came significantly later than scheduled
    /// (the process was suspended or the runtime was starved).
    pub overdue: bool,
}

// ---------------------------------------------------------------------------
// PeriodicTimer
// ---------------------------------------------------------------------------

/// An awaitable fixed-interval clock.
///
/// Designed to sit in an owning task's loop or `tokio::select!`:
///
/// ```ignore
/// loop {
///     tokio::select! {
///         _ = shutdown.cancelled() => break,
///         info = timer.wait() => refresh_check(info).await,
///     }
/// }
/// ```
pub struct PeriodicTimer {
    config: TimerConfig,
    /// When the next fire is due.
    next_fire: TokioInstant,
    tick_count: u64,
    paused: bool,
}

impl PeriodicTimer {
    /// Creates a timer from config. The first fire is scheduled one interval
    /// (plus optional jitter) from now.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter > Duration::ZERO {
            let max_ms = config.initial_jitter.as_millis() as u64;
            Duration::from_millis(rand::rng().random_range(0..=max_ms))
        } else {
            Duration::ZERO
        };
        let next_fire = TokioInstant::now() + config.interval + jitter;

        debug!(
            interval_secs = config.interval.as_secs(),
            jitter_ms = jitter.as_millis() as u64,
            "periodic timer created"
        );

        Self {
            config,
            next_fire,
            tick_count: 0,
            paused: false,
        }
    }

    /// Creates a timer with the given interval and no jitter.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(TimerConfig::with_interval(interval))
    }

    /// Waits until the next fire is due.
    ///
    /// While paused this future pends forever — it will never resolve on
    /// its own, but `tokio::select!` still processes other branches.
    pub async fn wait(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
            unreachable!()
        }

        time::sleep_until(self.next_fire).await;

        let now = TokioInstant::now();
        self.tick_count += 1;

        // Overdue detection: woke up more than one full interval late.
        let late_by = now.saturating_duration_since(self.next_fire);
        let overdue = late_by > self.config.interval;
        if overdue {
            warn!(
                tick = self.tick_count,
                late_secs = late_by.as_secs(),
                "timer fired overdue — rescheduling from now"
            );
        }

        // Always schedule from now, never from the missed deadline.
        self.next_fire = now + self.config.interval;

        trace!(tick = self.tick_count, overdue, "timer fired");

        TickInfo {
            tick: self.tick_count,
            overdue,
        }
    }

    /// Pauses the timer. [`wait`](Self::wait) pends until
    /// [`resume`](Self::resume) is called. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "periodic timer paused");
        }
    }

    /// Resumes after a pause. Re-arms the deadline to `now + interval` so
    /// the time spent paused doesn't produce an immediate fire.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_fire = TokioInstant::now() + self.config.interval;
            debug!(tick = self.tick_count, "periodic timer resumed");
        }
    }

    /// Whether the timer is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of fires so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

// ---------------------------------------------------------------------------
// spawn_periodic
// ---------------------------------------------------------------------------

/// Handle to a background periodic task.
///
/// Dropping the handle cancels the task, so storing it in the owning
/// struct ties the task's lifetime to the owner's.
#[derive(Debug)]
pub struct TaskHandle {
    inner: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    /// Cancels the background task. Idempotent.
    pub fn cancel(&self) {
        self.inner.abort();
    }

    /// Whether the task has stopped (cancelled or finished).
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.inner.abort();
    }
}

/// Spawns a background task that runs `f` on every fire of a
/// [`PeriodicTimer`] built from `config`.
pub fn spawn_periodic<F, Fut>(config: TimerConfig, mut f: F) -> TaskHandle
where
    F: FnMut(TickInfo) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let inner = tokio::spawn(async move {
        let mut timer = PeriodicTimer::new(config);
        loop {
            let info = timer.wait().await;
            f(info).await;
        }
    });
    TaskHandle { inner }
}
