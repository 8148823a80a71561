//! Per-queue retry and retention policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay curve between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// `base × 2^(n−1)` after the n-th failure.
    Exponential { base_secs: u64 },
    /// Same delay after every failure.
    Fixed { delay_secs: u64 },
}

/// Retry budget and retention bounds for one queue.
///
/// Retention is counted, not timed: keeping the last N completed/failed
/// jobs bounds storage regardless of throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before a job is marked failed.
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub keep_completed: usize,
    pub keep_failed: usize,
}

impl RetryPolicy {
    /// Send-queue default: 3 attempts, exponential 1m/2m/4m.
    pub fn send_queue() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential { base_secs: 60 },
            keep_completed: 100,
            keep_failed: 500,
        }
    }

    /// Reply-check default: 3 attempts, fixed 2m between retries.
    pub fn reply_check() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed { delay_secs: 120 },
            keep_completed: 100,
            keep_failed: 500,
        }
    }

    /// Delay before the retry that follows the n-th failed attempt
    /// (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential { base_secs } => {
                let exp = attempt.saturating_sub(1).min(16);
                Duration::from_secs(base_secs.saturating_mul(1 << exp))
            }
            Backoff::Fixed { delay_secs } => Duration::from_secs(delay_secs),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::send_queue()
    }
}
