//! Subscription and delivery-record types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest response-body prefix kept on a delivery record.
pub const MAX_RECORDED_RESPONSE: usize = 512;

/// A team's registration for event notifications at one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: Uuid,
    pub team_id: Uuid,
    pub url: String,
    /// Shared secret for payload signing. Never sent on the wire.
    pub secret: String,
    pub events: BTreeSet<String>,
    pub is_active: bool,
}

impl WebhookSubscription {
    pub fn new(
        team_id: Uuid,
        url: impl Into<String>,
        secret: impl Into<String>,
        events: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            url: url.into(),
            secret: secret.into(),
            events: events.into_iter().collect(),
            is_active: true,
        }
    }

    /// Whether this subscription should receive `event`.
    pub fn wants(&self, event: &str) -> bool {
        self.is_active && self.events.contains(event)
    }
}

/// The canonical payload shape delivered to endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// One recorded delivery attempt.
///
/// A record is appended per attempt — success or failure — so the audit
/// trail answers "what did attempt 2 return" directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event: String,
    pub payload: String,
    /// HTTP status, absent when the request never got a response.
    pub status: Option<u16>,
    /// Response body truncated to [`MAX_RECORDED_RESPONSE`] bytes.
    pub response: String,
    /// 1-based attempt number within the delivery sequence.
    pub attempt: u32,
    pub success: bool,
    pub delivered_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub fn record(
        webhook_id: Uuid,
        event: &str,
        payload: &str,
        status: Option<u16>,
        response: &str,
        attempt: u32,
        success: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            webhook_id,
            event: event.to_string(),
            payload: payload.to_string(),
            status,
            response: truncate(response, MAX_RECORDED_RESPONSE),
            attempt,
            success,
            delivered_at: Utc::now(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    // Cut on a char boundary at or below the byte limit.
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
