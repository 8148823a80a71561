//! In-memory delivery-queue backend.
//!
//! Suitable for single-instance deployments and tests. Jobs live in
//! per-queue shards behind one async lock; the delayed/waiting split is
//! derived from `run_at` rather than promoted by a background task.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{DeliveryQueue, EnqueueOpts, QueueStats};
use crate::error::QueueError;
use crate::job::{Job, JobState};
use crate::policy::RetryPolicy;

struct Shard {
    policy: RetryPolicy,
    jobs: HashMap<String, Job>,
    /// Completion order, oldest first, for retention trimming.
    completed_order: VecDeque<String>,
    failed_order: VecDeque<String>,
}

impl Shard {
    fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            jobs: HashMap::new(),
            completed_order: VecDeque::new(),
            failed_order: VecDeque::new(),
        }
    }

    fn trim_completed(&mut self) {
        while self.completed_order.len() > self.policy.keep_completed {
            if let Some(id) = self.completed_order.pop_front() {
                self.jobs.remove(&id);
            }
        }
    }

    fn trim_failed(&mut self) {
        while self.failed_order.len() > self.policy.keep_failed {
            if let Some(id) = self.failed_order.pop_front() {
                self.jobs.remove(&id);
            }
        }
    }
}

/// In-process [`DeliveryQueue`] implementation.
pub struct MemoryQueue {
    shards: Mutex<HashMap<String, Shard>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            shards: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-register a queue with an explicit policy. Queues touched
    /// without registration get [`RetryPolicy::default`].
    pub async fn register(&self, queue: &str, policy: RetryPolicy) {
        let mut shards = self.shards.lock().await;
        shards
            .entry(queue.to_string())
            .or_insert_with(|| Shard::new(policy));
    }

    fn queue_of(shards: &HashMap<String, Shard>, job_id: &str) -> Option<String> {
        shards
            .iter()
            .find(|(_, shard)| shard.jobs.contains_key(job_id))
            .map(|(name, _)| name.clone())
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryQueue for MemoryQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        opts: EnqueueOpts,
    ) -> Result<Job, QueueError> {
        let mut shards = self.shards.lock().await;
        let shard = shards
            .entry(queue.to_string())
            .or_insert_with(|| Shard::new(RetryPolicy::default()));

        let id = opts
            .job_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Idempotent dedup: an outstanding job with this id wins.
        if let Some(existing) = shard.jobs.get(&id) {
            match existing.state {
                JobState::Pending | JobState::Active => {
                    debug!(job_id = %id, queue, "enqueue deduplicated against outstanding job");
                    return Ok(existing.clone());
                }
                // A finished record with the same id is superseded.
                JobState::Completed => {
                    shard.completed_order.retain(|j| j != &id);
                }
                JobState::Failed => {
                    shard.failed_order.retain(|j| j != &id);
                }
            }
        }

        let now = Utc::now();
        let delay = opts.delay.unwrap_or_default();
        let job = Job {
            id: id.clone(),
            queue: queue.to_string(),
            payload,
            priority: opts.priority.unwrap_or(0),
            state: JobState::Pending,
            run_at: now
                + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero()),
            attempts: 0,
            last_error: None,
            enqueued_at: now,
        };
        shard.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn list_delayed(&self, queue: &str) -> Result<Vec<Job>, QueueError> {
        let shards = self.shards.lock().await;
        let shard = shards
            .get(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.to_string()))?;
        let now = Utc::now();
        Ok(shard
            .jobs
            .values()
            .filter(|j| j.is_delayed(now))
            .cloned()
            .collect())
    }

    async fn list_waiting(&self, queue: &str) -> Result<Vec<Job>, QueueError> {
        let shards = self.shards.lock().await;
        let shard = shards
            .get(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.to_string()))?;
        let now = Utc::now();
        Ok(shard
            .jobs
            .values()
            .filter(|j| j.is_waiting(now))
            .cloned()
            .collect())
    }

    async fn remove(&self, job_id: &str) -> Result<bool, QueueError> {
        let mut shards = self.shards.lock().await;
        let Some(queue) = Self::queue_of(&shards, job_id) else {
            return Ok(false);
        };
        let shard = shards
            .get_mut(&queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;

        // Claimed or finished jobs are not recalled.
        match shard.jobs.get(job_id).map(|j| j.state) {
            Some(JobState::Pending) => {
                shard.jobs.remove(job_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_due(
        &self,
        queue: &str,
        max: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, QueueError> {
        let mut shards = self.shards.lock().await;
        let shard = shards
            .get_mut(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.to_string()))?;

        let mut due: Vec<(i32, DateTime<Utc>, String)> = shard
            .jobs
            .values()
            .filter(|j| j.is_waiting(now))
            .map(|j| (j.priority, j.run_at, j.id.clone()))
            .collect();
        due.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut claimed = Vec::new();
        for (_, _, id) in due.into_iter().take(max) {
            if let Some(job) = shard.jobs.get_mut(&id) {
                job.state = JobState::Active;
                job.attempts += 1;
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, job_id: &str) -> Result<(), QueueError> {
        let mut shards = self.shards.lock().await;
        let Some(queue) = Self::queue_of(&shards, job_id) else {
            return Err(QueueError::JobNotFound(job_id.to_string()));
        };
        let shard = shards
            .get_mut(&queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;
        if let Some(job) = shard.jobs.get_mut(job_id) {
            job.state = JobState::Completed;
            shard.completed_order.push_back(job_id.to_string());
            shard.trim_completed();
        }
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<(), QueueError> {
        let mut shards = self.shards.lock().await;
        let Some(queue) = Self::queue_of(&shards, job_id) else {
            return Err(QueueError::JobNotFound(job_id.to_string()));
        };
        let shard = shards
            .get_mut(&queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;
        let policy = shard.policy;

        if let Some(job) = shard.jobs.get_mut(job_id) {
            job.last_error = Some(error.to_string());
            if job.attempts >= policy.max_attempts {
                warn!(
                    job_id,
                    queue = %queue,
                    attempts = job.attempts,
                    error,
                    "job exhausted retry budget, marking failed"
                );
                job.state = JobState::Failed;
                shard.failed_order.push_back(job_id.to_string());
                shard.trim_failed();
            } else {
                let delay = policy.delay_after_attempt(job.attempts);
                job.state = JobState::Pending;
                job.run_at = Utc::now()
                    + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero());
                debug!(
                    job_id,
                    queue = %queue,
                    attempt = job.attempts,
                    retry_in_secs = delay.as_secs(),
                    "job failed, retry scheduled"
                );
            }
        }
        Ok(())
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError> {
        let shards = self.shards.lock().await;
        let shard = shards
            .get(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.to_string()))?;
        let now = Utc::now();
        let mut stats = QueueStats {
            waiting: 0,
            delayed: 0,
            active: 0,
            completed: 0,
            failed: 0,
        };
        for job in shard.jobs.values() {
            match job.state {
                JobState::Pending if job.run_at > now => stats.delayed += 1,
                JobState::Pending => stats.waiting += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Backoff;
    use std::time::Duration;

    const SENDS: &str = "campaign-sends";

    fn payload(n: u32) -> serde_json::Value {
        serde_json::json!({ "n": n })
    }

    #[tokio::test]
    async fn enqueue_dedups_outstanding_job_ids() {
        let queue = MemoryQueue::new();
        let first = queue
            .enqueue(
                SENDS,
                payload(1),
                EnqueueOpts {
                    job_id: Some("job-1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let second = queue
            .enqueue(
                SENDS,
                payload(2),
                EnqueueOpts {
                    job_id: Some("job-1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // The original payload survives; no duplicate was created.
        assert_eq!(second.payload, first.payload);
        let stats = queue.stats(SENDS).await.unwrap();
        assert_eq!(stats.waiting + stats.delayed, 1);
    }

    #[tokio::test]
    async fn delayed_and_waiting_split_on_run_at() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(SENDS, payload(1), EnqueueOpts::default())
            .await
            .unwrap();
        queue
            .enqueue(
                SENDS,
                payload(2),
                EnqueueOpts {
                    delay: Some(Duration::from_secs(3600)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(queue.list_waiting(SENDS).await.unwrap().len(), 1);
        assert_eq!(queue.list_delayed(SENDS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_only_touches_unclaimed_jobs() {
        let queue = MemoryQueue::new();
        let job = queue
            .enqueue(SENDS, payload(1), EnqueueOpts::default())
            .await
            .unwrap();
        assert!(queue.remove(&job.id).await.unwrap());
        assert!(!queue.remove(&job.id).await.unwrap(), "already gone");

        let job = queue
            .enqueue(SENDS, payload(2), EnqueueOpts::default())
            .await
            .unwrap();
        let claimed = queue.claim_due(SENDS, 10, Utc::now()).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert!(
            !queue.remove(&job.id).await.unwrap(),
            "claimed jobs are not recalled"
        );
    }

    #[tokio::test]
    async fn claim_orders_by_priority_then_run_at() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(
                SENDS,
                payload(1),
                EnqueueOpts {
                    job_id: Some("low".into()),
                    priority: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        queue
            .enqueue(
                SENDS,
                payload(2),
                EnqueueOpts {
                    job_id: Some("high".into()),
                    priority: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let claimed = queue.claim_due(SENDS, 1, Utc::now()).await.unwrap();
        assert_eq!(claimed[0].id, "high");
    }

    #[tokio::test]
    async fn failure_schedules_exponential_retries_then_fails() {
        let queue = MemoryQueue::new();
        queue.register(SENDS, RetryPolicy::send_queue()).await;
        let job = queue
            .enqueue(SENDS, payload(1), EnqueueOpts::default())
            .await
            .unwrap();

        // Attempt 1 fails: retry in ~60s.
        queue.claim_due(SENDS, 1, Utc::now()).await.unwrap();
        queue.fail(&job.id, "smtp 451").await.unwrap();
        let delayed = queue.list_delayed(SENDS).await.unwrap();
        assert_eq!(delayed.len(), 1);
        assert_eq!(delayed[0].attempts, 1);

        // Attempts 2 and 3 fail: job lands in failed, retained.
        let later = Utc::now() + ChronoDuration::hours(1);
        queue.claim_due(SENDS, 1, later).await.unwrap();
        queue.fail(&job.id, "smtp 451").await.unwrap();
        let much_later = Utc::now() + ChronoDuration::hours(2);
        queue.claim_due(SENDS, 1, much_later).await.unwrap();
        queue.fail(&job.id, "smtp 451").await.unwrap();

        let stats = queue.stats(SENDS).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.waiting + stats.delayed, 0);
    }

    #[tokio::test]
    async fn retention_trims_oldest_completed() {
        let queue = MemoryQueue::new();
        queue
            .register(
                SENDS,
                RetryPolicy {
                    max_attempts: 3,
                    backoff: Backoff::Exponential { base_secs: 60 },
                    keep_completed: 2,
                    keep_failed: 2,
                },
            )
            .await;

        for n in 0..5 {
            let job = queue
                .enqueue(SENDS, payload(n), EnqueueOpts::default())
                .await
                .unwrap();
            queue.claim_due(SENDS, 10, Utc::now()).await.unwrap();
            queue.complete(&job.id).await.unwrap();
        }

        let stats = queue.stats(SENDS).await.unwrap();
        assert_eq!(stats.completed, 2);
    }
}
