//! Campaigns and their ordered outreach sequences.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::SendingSchedule;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    /// Terminal states accept no further lifecycle commands.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed)
    }
}

/// What a sequence step does once its delay has elapsed.
///
/// Modeled as a tagged enum so "find the next email step" is a total
/// function over the variant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Email { subject: String, body: String },
    Wait,
    Condition { field: String, equals: String },
    Task { title: String },
}

/// One ordered unit of a campaign's outreach plan.
///
/// Delays are offsets relative to the previous step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub delay_days: u32,
    pub delay_hours: u32,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl SequenceStep {
    pub fn email(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            delay_days: 0,
            delay_hours: 0,
            kind: StepKind::Email {
                subject: subject.into(),
                body: body.into(),
            },
        }
    }

    pub fn with_delay(mut self, days: u32, hours: u32) -> Self {
        self.delay_days = days;
        self.delay_hours = hours;
        self
    }

    pub fn is_email(&self) -> bool {
        matches!(self.kind, StepKind::Email { .. })
    }
}

/// A multi-step outreach campaign owned by a team.
///
/// The owning account reference is shared, not owned: the account row
/// lives in the store and several campaigns may point at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    pub daily_limit: u32,
    pub schedule: SendingSchedule,
    pub account_id: Uuid,
    pub steps: Vec<SequenceStep>,
}

impl Campaign {
    pub fn new(
        team_id: Uuid,
        name: impl Into<String>,
        account_id: Uuid,
        daily_limit: u32,
        schedule: SendingSchedule,
        steps: Vec<SequenceStep>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            name: name.into(),
            status: CampaignStatus::Draft,
            daily_limit: daily_limit.max(1),
            schedule,
            account_id,
            steps,
        }
    }

    /// Whether the sequence contains at least one email step.
    pub fn has_email_step(&self) -> bool {
        self.steps.iter().any(SequenceStep::is_email)
    }

    /// Index of the first email step in the sequence.
    pub fn first_email_step(&self) -> Option<usize> {
        self.steps.iter().position(SequenceStep::is_email)
    }

    /// Index of the next email step strictly after `current`.
    ///
    /// `None` means the prospect has no more emails coming and can be
    /// completed.
    pub fn next_email_step_after(&self, current: usize) -> Option<usize> {
        self.steps
            .iter()
            .enumerate()
            .skip(current + 1)
            .find(|(_, step)| step.is_email())
            .map(|(idx, _)| idx)
    }
}
