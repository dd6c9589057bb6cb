//! The background refresh task.
//!
//! A thin bridge between [`agora_timer`] and [`SessionManager`]: every
//! tick it runs [`SessionManager::scheduled_check`], which refreshes the
//! token when it is close to expiry. The task holds an `Arc` to the
//! manager and nothing else.

use std::sync::Arc;
use std::time::Duration;

use agora_timer::{spawn_periodic, TaskHandle, TimerConfig};

use crate::{AuthBackend, SessionManager, TokenStore};

/// Configuration for the refresh cadence.
///
/// The check interval should be well under
/// [`SessionConfig::refresh_threshold`](crate::SessionConfig), so a token
/// cannot expire between two checks.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// How often to run the freshness check.
    pub check_interval: Duration,
    /// Random delay before the first check, so many tabs started at once
    /// don't all hit the refresh endpoint together.
    pub initial_jitter: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(180),
            initial_jitter: Duration::from_secs(15),
        }
    }
}

/// Handle to the spawned refresh task. Dropping it stops the task.
pub struct RefreshTask {
    handle: TaskHandle,
}

impl RefreshTask {
    /// Spawns the periodic freshness check against `manager`.
    pub fn spawn<S, B>(manager: Arc<SessionManager<S, B>>, config: RefreshConfig) -> Self
    where
        S: TokenStore,
        B: AuthBackend,
    {
        let timer = TimerConfig {
            interval: config.check_interval,
            initial_jitter: config.initial_jitter,
        }
        .validated();

        let handle = spawn_periodic(timer, move |info| {
            let manager = Arc::clone(&manager);
            async move {
                if info.overdue {
                    tracing::debug!(tick = info.tick, "freshness check ran late");
                }
                manager.scheduled_check().await;
            }
        });

        Self { handle }
    }

    /// Stops the task. Idempotent.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Whether the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
