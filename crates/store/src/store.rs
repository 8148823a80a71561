//! The narrow contract the orchestrator and sweep depend on.
//!
//! Point lookups, filtered scans, and a handful of atomic per-row
//! operations (status compare-and-set, bounded counter increment). Any
//! relational store can implement this; [`crate::MemoryStore`] is the
//! in-process reference implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cadence_core::{
    Campaign, CampaignStatus, Prospect, ProspectStatus, SendAccount, SendingSchedule,
};
use cadence_rotation::HealthEvent;
use cadence_webhook::{WebhookDelivery, WebhookSubscription};

use crate::error::StoreError;

#[async_trait]
pub trait Store: Send + Sync {
    // ── Campaigns ───────────────────────────────────────────────

    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError>;

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError>;

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError>;

    async fn campaigns_with_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<Campaign>, StoreError>;

    /// Atomically move a campaign from `from` to `to`. Returns false
    /// (and changes nothing) when the current status is not `from`.
    async fn compare_and_set_campaign_status(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, StoreError>;

    /// Replace a campaign's sending schedule.
    async fn set_campaign_schedule(
        &self,
        id: Uuid,
        schedule: SendingSchedule,
    ) -> Result<(), StoreError>;

    // ── Prospects ───────────────────────────────────────────────

    async fn insert_prospect(&self, prospect: Prospect) -> Result<(), StoreError>;

    async fn prospect(&self, id: Uuid) -> Result<Option<Prospect>, StoreError>;

    async fn prospects_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<Prospect>, StoreError>;

    async fn prospects_with_status(
        &self,
        campaign_id: Uuid,
        status: ProspectStatus,
    ) -> Result<Vec<Prospect>, StoreError>;

    /// Prospects still inside the sending flow (Pending or Sending).
    async fn count_schedulable_prospects(&self, campaign_id: Uuid) -> Result<usize, StoreError>;

    /// Pending prospects whose `next_scheduled_at` has elapsed, oldest
    /// due first, capped at `limit`.
    async fn due_prospects(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Prospect>, StoreError>;

    /// Atomically move a prospect from `from` to `to`. Clears
    /// `next_scheduled_at` when `to` is not schedulable, preserving the
    /// data-model invariant.
    async fn compare_and_set_prospect_status(
        &self,
        id: Uuid,
        from: ProspectStatus,
        to: ProspectStatus,
    ) -> Result<bool, StoreError>;

    /// Position a prospect in its sequence: status, step index, and the
    /// next send instant in one row update. `next_scheduled_at` is
    /// dropped for non-schedulable statuses.
    async fn update_prospect_schedule(
        &self,
        id: Uuid,
        status: ProspectStatus,
        current_step: usize,
        next_scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    // ── Accounts ────────────────────────────────────────────────

    async fn insert_account(&self, account: SendAccount) -> Result<(), StoreError>;

    async fn account(&self, id: Uuid) -> Result<Option<SendAccount>, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<SendAccount>, StoreError>;

    /// Count one send against the account's daily cap and stamp
    /// `last_connected_at`. Atomic: returns false at capacity so two
    /// concurrent dispatch paths can never over-send past the limit.
    async fn try_increment_sent_today(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Apply one bounce/spam/error event and recompute health. Returns
    /// the updated account.
    async fn record_health_event(
        &self,
        id: Uuid,
        event: HealthEvent,
    ) -> Result<SendAccount, StoreError>;

    /// Zero `sent_today` on every account (the daily reset task).
    /// Returns the number of accounts touched.
    async fn reset_daily_counters(&self) -> Result<usize, StoreError>;

    // ── Webhooks ────────────────────────────────────────────────

    async fn insert_subscription(
        &self,
        subscription: WebhookSubscription,
    ) -> Result<(), StoreError>;

    async fn list_subscriptions(&self, team_id: Uuid)
        -> Result<Vec<WebhookSubscription>, StoreError>;

    /// Delivery audit trail for one subscription, oldest first.
    async fn deliveries_for(&self, webhook_id: Uuid)
        -> Result<Vec<WebhookDelivery>, StoreError>;
}
