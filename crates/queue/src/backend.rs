//! The delivery-queue contract.
//!
//! An abstraction over a durable, priority-and-delay-capable job store
//! addressed by queue name. The orchestrator enqueues through it;
//! out-of-process workers claim, complete, and fail jobs through the
//! same trait. Implementable over any durable queue (a Redis-backed job
//! store, a database poll loop) — [`crate::MemoryQueue`] is the
//! in-process implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::QueueError;
use crate::job::Job;

/// Options for a single enqueue.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOpts {
    /// Idempotent job id: re-enqueueing an id that is still outstanding
    /// (pending or active) returns the existing job unchanged.
    pub job_id: Option<String>,
    /// Time to hold the job before workers may claim it.
    pub delay: Option<Duration>,
    /// Lower value = claimed sooner among due jobs. Defaults to 0.
    pub priority: Option<i32>,
}

/// Point-in-time queue counters.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub delayed: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Durable job store contract.
///
/// `enqueue` returns once the job is durably recorded, never once a
/// worker has run. There is no mid-flight cancellation: `remove` only
/// takes out jobs no worker has claimed yet.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Add a job to the named queue.
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        opts: EnqueueOpts,
    ) -> Result<Job, QueueError>;

    /// Pending jobs whose `run_at` is still in the future.
    async fn list_delayed(&self, queue: &str) -> Result<Vec<Job>, QueueError>;

    /// Pending jobs that are due now.
    async fn list_waiting(&self, queue: &str) -> Result<Vec<Job>, QueueError>;

    /// Remove a not-yet-claimed job. Returns false when the job is
    /// unknown or already claimed/finished.
    async fn remove(&self, job_id: &str) -> Result<bool, QueueError>;

    /// Claim up to `max` due jobs, marking them active and counting the
    /// attempt. Ordered by (priority, run_at).
    async fn claim_due(&self, queue: &str, max: usize, now: DateTime<Utc>)
        -> Result<Vec<Job>, QueueError>;

    /// Mark an active job completed.
    async fn complete(&self, job_id: &str) -> Result<(), QueueError>;

    /// Record a worker-side failure. Schedules a retry per the queue's
    /// policy, or marks the job failed (and retains it) once attempts
    /// are exhausted — never silently dropped.
    async fn fail(&self, job_id: &str, error: &str) -> Result<(), QueueError>;

    /// Counters for one queue.
    async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError>;
}
