//! Sending account: per-account daily capacity and reputation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A connected sending account.
///
/// `sent_today` is reset to 0 by the daily counter-reset task.
/// `health_score` (0–100) is recomputed on every bounce/spam/error event;
/// an account whose score drops below the deactivation threshold is
/// switched off automatically and leaves rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendAccount {
    pub id: Uuid,
    pub email: String,
    pub daily_limit: u32,
    pub sent_today: u32,
    pub health_score: u8,
    pub is_active: bool,
    pub bounce_count: u32,
    pub spam_report_count: u32,
    pub error_count: u32,
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl SendAccount {
    /// Fresh account at full health with nothing sent.
    pub fn new(email: impl Into<String>, daily_limit: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            daily_limit: daily_limit.max(1),
            sent_today: 0,
            health_score: 100,
            is_active: true,
            bounce_count: 0,
            spam_report_count: 0,
            error_count: 0,
            last_connected_at: None,
        }
    }

    /// Sends left before the daily cap is hit.
    pub fn remaining_capacity(&self) -> u32 {
        self.daily_limit.saturating_sub(self.sent_today)
    }
}
