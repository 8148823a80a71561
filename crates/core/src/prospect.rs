//! Prospects: the recipients a campaign works through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProspectStatus {
    Pending,
    Sending,
    Paused,
    Completed,
    Bounced,
    Unsubscribed,
}

impl ProspectStatus {
    /// Terminal states never re-enter the sending flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProspectStatus::Completed | ProspectStatus::Bounced | ProspectStatus::Unsubscribed
        )
    }

    /// Whether a prospect in this status may carry `next_scheduled_at`.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, ProspectStatus::Pending | ProspectStatus::Sending)
    }
}

/// One recipient inside exactly one campaign.
///
/// Invariant: `next_scheduled_at` is `Some` only while the status is
/// schedulable (Pending or Sending).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub email: String,
    pub status: ProspectStatus,
    pub current_step: usize,
    pub next_scheduled_at: Option<DateTime<Utc>>,
}

impl Prospect {
    pub fn new(campaign_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            email: email.into(),
            status: ProspectStatus::Pending,
            current_step: 0,
            next_scheduled_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ProspectStatus::Completed.is_terminal());
        assert!(ProspectStatus::Bounced.is_terminal());
        assert!(ProspectStatus::Unsubscribed.is_terminal());
        assert!(!ProspectStatus::Pending.is_terminal());
        assert!(!ProspectStatus::Paused.is_terminal());
    }

    #[test]
    fn schedulable_statuses() {
        assert!(ProspectStatus::Pending.is_schedulable());
        assert!(ProspectStatus::Sending.is_schedulable());
        assert!(!ProspectStatus::Paused.is_schedulable());
        assert!(!ProspectStatus::Completed.is_schedulable());
    }
}
