//! Job model and the send-job payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue name for campaign send jobs.
pub const SEND_QUEUE: &str = "campaign-sends";
/// Queue name for reply-detection checks.
pub const REPLY_CHECK_QUEUE: &str = "reply-checks";

/// Payload handed to the transport worker for one prospect/step send.
///
/// Workers must re-check the prospect's and campaign's status before
/// actually sending — a job is never recalled once claimed, so pause and
/// terminal statuses are enforced at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendJob {
    pub prospect_id: Uuid,
    pub campaign_id: Uuid,
    pub step_index: usize,
    pub account_id: Uuid,
}

impl SendJob {
    /// Deduplication id: one outstanding job per (prospect, step).
    pub fn dedup_id(&self) -> String {
        format!("send-{}-{}", self.prospect_id, self.step_index)
    }
}

/// Where a job sits in its lifecycle.
///
/// A `Pending` job is "delayed" while its `run_at` lies in the future
/// and "waiting" once it is due; the split is derived, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Active,
    Completed,
    Failed,
}

/// One unit of queued work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub queue: String,
    pub payload: serde_json::Value,
    /// Lower value = claimed sooner among due jobs.
    pub priority: i32,
    pub state: JobState,
    /// Earliest instant a worker may claim the job.
    pub run_at: DateTime<Utc>,
    /// Claims so far; incremented when a worker takes the job.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job is pending with a future `run_at`.
    pub fn is_delayed(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Pending && self.run_at > now
    }

    /// Whether the job is pending and due.
    pub fn is_waiting(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Pending && self.run_at <= now
    }

    /// Parse the payload back into a typed value.
    pub fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_id_is_stable_per_prospect_and_step() {
        let job = SendJob {
            prospect_id: Uuid::nil(),
            campaign_id: Uuid::new_v4(),
            step_index: 2,
            account_id: Uuid::new_v4(),
        };
        assert_eq!(
            job.dedup_id(),
            "send-00000000-0000-0000-0000-000000000000-2"
        );
    }

    #[test]
    fn send_job_roundtrips_through_job_payload() {
        let send = SendJob {
            prospect_id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            step_index: 0,
            account_id: Uuid::new_v4(),
        };
        let job = Job {
            id: send.dedup_id(),
            queue: SEND_QUEUE.to_string(),
            payload: serde_json::to_value(&send).unwrap(),
            priority: 0,
            state: JobState::Pending,
            run_at: Utc::now(),
            attempts: 0,
            last_error: None,
            enqueued_at: Utc::now(),
        };
        assert_eq!(job.parse_payload::<SendJob>().unwrap(), send);
    }
}
