//! Reconnect policy: the fixed delay ladder walked after a connection drops.
//!
//! The policy lives in the transport layer. Higher layers (the hub registry)
//! never implement their own backoff — they observe state transitions and
//! log them.

use std::time::Duration;

/// Ordered delays to wait before each retry.
///
/// The opening dial of a connection is not governed by the policy — it
/// always happens. Retry 0 waits `delays[0]`, retry 1 waits `delays[1]`,
/// and so on. Once the ladder is exhausted the connection is given up for
/// good and the owner transitions to `Disconnected`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
}

impl ReconnectPolicy {
    /// Creates a policy with explicit delays.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// A policy that never reconnects. The first drop is final.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// The delay before the given attempt, or `None` when the ladder is
    /// exhausted.
    pub fn delay(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }

    /// Total number of reconnect attempts this policy allows.
    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }
}

/// Immediate retry, then 2s, 10s, 30s, then give up.
impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ],
        }
    }
}
