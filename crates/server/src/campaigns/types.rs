//! Request/response shapes for campaign endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cadence_core::{SendingSchedule, SequenceStep};

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub team_id: Uuid,
    pub name: String,
    pub account_id: Uuid,
    pub daily_limit: u32,
    /// Omitted or invalid schedules fall back to the system default.
    #[serde(default)]
    pub schedule: Option<SendingSchedule>,
    pub steps: Vec<SequenceStep>,
}

#[derive(Debug, Deserialize)]
pub struct AddProspectsRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddProspectsResponse {
    pub added: usize,
}

/// Lifecycle command result, per the command contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub enqueued_count: usize,
}
