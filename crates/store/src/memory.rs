//! In-memory store.
//!
//! Every mutation takes the row map's write lock for the whole
//! read-modify-write, which is what makes the compare-and-set and
//! bounded-increment operations atomic here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use cadence_core::{
    Campaign, CampaignStatus, Prospect, ProspectStatus, SendAccount, SendingSchedule,
};
use cadence_rotation::{apply_health_event, HealthEvent};
use cadence_webhook::{WebhookDelivery, WebhookError, WebhookStore, WebhookSubscription};

use crate::error::StoreError;
use crate::store::Store;

#[derive(Default)]
pub struct MemoryStore {
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
    prospects: RwLock<HashMap<Uuid, Prospect>>,
    accounts: RwLock<HashMap<Uuid, SendAccount>>,
    subscriptions: RwLock<HashMap<Uuid, WebhookSubscription>>,
    deliveries: RwLock<Vec<WebhookDelivery>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
        self.campaigns.write().await.insert(campaign.id, campaign);
        Ok(())
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        Ok(self.campaigns.read().await.get(&id).cloned())
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        Ok(self.campaigns.read().await.values().cloned().collect())
    }

    async fn campaigns_with_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<Campaign>, StoreError> {
        Ok(self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect())
    }

    async fn compare_and_set_campaign_status(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(StoreError::CampaignNotFound(id))?;
        if campaign.status != from {
            return Ok(false);
        }
        campaign.status = to;
        Ok(true)
    }

    async fn set_campaign_schedule(
        &self,
        id: Uuid,
        schedule: SendingSchedule,
    ) -> Result<(), StoreError> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(StoreError::CampaignNotFound(id))?;
        campaign.schedule = schedule;
        Ok(())
    }

    async fn insert_prospect(&self, prospect: Prospect) -> Result<(), StoreError> {
        self.prospects.write().await.insert(prospect.id, prospect);
        Ok(())
    }

    async fn prospect(&self, id: Uuid) -> Result<Option<Prospect>, StoreError> {
        Ok(self.prospects.read().await.get(&id).cloned())
    }

    async fn prospects_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<Prospect>, StoreError> {
        Ok(self
            .prospects
            .read()
            .await
            .values()
            .filter(|p| p.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn prospects_with_status(
        &self,
        campaign_id: Uuid,
        status: ProspectStatus,
    ) -> Result<Vec<Prospect>, StoreError> {
        Ok(self
            .prospects
            .read()
            .await
            .values()
            .filter(|p| p.campaign_id == campaign_id && p.status == status)
            .cloned()
            .collect())
    }

    async fn count_schedulable_prospects(&self, campaign_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .prospects
            .read()
            .await
            .values()
            .filter(|p| p.campaign_id == campaign_id && p.status.is_schedulable())
            .count())
    }

    async fn due_prospects(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Prospect>, StoreError> {
        let prospects = self.prospects.read().await;
        let mut due: Vec<Prospect> = prospects
            .values()
            .filter(|p| {
                p.campaign_id == campaign_id
                    && p.status == ProspectStatus::Pending
                    && p.next_scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|p| p.next_scheduled_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn compare_and_set_prospect_status(
        &self,
        id: Uuid,
        from: ProspectStatus,
        to: ProspectStatus,
    ) -> Result<bool, StoreError> {
        let mut prospects = self.prospects.write().await;
        let prospect = prospects
            .get_mut(&id)
            .ok_or(StoreError::ProspectNotFound(id))?;
        if prospect.status != from {
            return Ok(false);
        }
        prospect.status = to;
        if !to.is_schedulable() {
            prospect.next_scheduled_at = None;
        }
        Ok(true)
    }

    async fn update_prospect_schedule(
        &self,
        id: Uuid,
        status: ProspectStatus,
        current_step: usize,
        next_scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut prospects = self.prospects.write().await;
        let prospect = prospects
            .get_mut(&id)
            .ok_or(StoreError::ProspectNotFound(id))?;
        prospect.status = status;
        prospect.current_step = current_step;
        prospect.next_scheduled_at = if status.is_schedulable() {
            next_scheduled_at
        } else {
            None
        };
        Ok(())
    }

    async fn insert_account(&self, account: SendAccount) -> Result<(), StoreError> {
        self.accounts.write().await.insert(account.id, account);
        Ok(())
    }

    async fn account(&self, id: Uuid) -> Result<Option<SendAccount>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<SendAccount>, StoreError> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    async fn try_increment_sent_today(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        if account.sent_today >= account.daily_limit {
            return Ok(false);
        }
        account.sent_today += 1;
        account.last_connected_at = Some(now);
        Ok(true)
    }

    async fn record_health_event(
        &self,
        id: Uuid,
        event: HealthEvent,
    ) -> Result<SendAccount, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        apply_health_event(account, event);
        Ok(account.clone())
    }

    async fn reset_daily_counters(&self) -> Result<usize, StoreError> {
        let mut accounts = self.accounts.write().await;
        for account in accounts.values_mut() {
            account.sent_today = 0;
        }
        Ok(accounts.len())
    }

    async fn insert_subscription(
        &self,
        subscription: WebhookSubscription,
    ) -> Result<(), StoreError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription);
        Ok(())
    }

    async fn list_subscriptions(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<WebhookSubscription>, StoreError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn deliveries_for(
        &self,
        webhook_id: Uuid,
    ) -> Result<Vec<WebhookDelivery>, StoreError> {
        Ok(self
            .deliveries
            .read()
            .await
            .iter()
            .filter(|d| d.webhook_id == webhook_id)
            .cloned()
            .collect())
    }
}

/// The dispatcher's view of the same data.
#[async_trait]
impl WebhookStore for MemoryStore {
    async fn subscriptions_for_event(
        &self,
        team_id: Uuid,
        event: &str,
    ) -> Result<Vec<WebhookSubscription>, WebhookError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.team_id == team_id && s.wants(event))
            .cloned()
            .collect())
    }

    async fn record_delivery(&self, delivery: WebhookDelivery) -> Result<(), WebhookError> {
        self.deliveries.write().await.push(delivery);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::SendingSchedule;

    fn seeded_campaign(store_status: CampaignStatus) -> Campaign {
        let mut campaign = Campaign::new(
            Uuid::new_v4(),
            "launch",
            Uuid::new_v4(),
            50,
            SendingSchedule::default(),
            vec![cadence_core::SequenceStep::email("hi", "hello")],
        );
        campaign.status = store_status;
        campaign
    }

    #[tokio::test]
    async fn campaign_cas_only_moves_from_expected_status() {
        let store = MemoryStore::new();
        let campaign = seeded_campaign(CampaignStatus::Draft);
        let id = campaign.id;
        store.insert_campaign(campaign).await.unwrap();

        assert!(store
            .compare_and_set_campaign_status(id, CampaignStatus::Draft, CampaignStatus::Active)
            .await
            .unwrap());
        // Second identical CAS observes Active, not Draft.
        assert!(!store
            .compare_and_set_campaign_status(id, CampaignStatus::Draft, CampaignStatus::Active)
            .await
            .unwrap());

        let stored = store.campaign(id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Active);
    }

    #[tokio::test]
    async fn prospect_cas_clears_schedule_on_non_schedulable_target() {
        let store = MemoryStore::new();
        let mut prospect = Prospect::new(Uuid::new_v4(), "p@example.com");
        prospect.status = ProspectStatus::Sending;
        prospect.next_scheduled_at = Some(Utc::now());
        let id = prospect.id;
        store.insert_prospect(prospect).await.unwrap();

        assert!(store
            .compare_and_set_prospect_status(id, ProspectStatus::Sending, ProspectStatus::Paused)
            .await
            .unwrap());
        let stored = store.prospect(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProspectStatus::Paused);
        assert!(stored.next_scheduled_at.is_none());
    }

    #[tokio::test]
    async fn due_prospects_filters_sorts_and_caps() {
        let store = MemoryStore::new();
        let campaign_id = Uuid::new_v4();
        let now = Utc::now();

        for minutes_ago in [30, 10, 20] {
            let mut p = Prospect::new(campaign_id, "p@example.com");
            p.next_scheduled_at = Some(now - chrono::Duration::minutes(minutes_ago));
            store.insert_prospect(p).await.unwrap();
        }
        // Not yet due.
        let mut future = Prospect::new(campaign_id, "f@example.com");
        future.next_scheduled_at = Some(now + chrono::Duration::minutes(5));
        store.insert_prospect(future).await.unwrap();
        // Due but wrong status.
        let mut paused = Prospect::new(campaign_id, "x@example.com");
        paused.status = ProspectStatus::Paused;
        store.insert_prospect(paused).await.unwrap();

        let due = store.due_prospects(campaign_id, now, 2).await.unwrap();
        assert_eq!(due.len(), 2);
        // Oldest due first: 30 then 20 minutes ago.
        assert!(due[0].next_scheduled_at < due[1].next_scheduled_at);
    }

    #[tokio::test]
    async fn sent_today_increment_stops_at_daily_limit() {
        let store = MemoryStore::new();
        let mut account = SendAccount::new("a@example.com", 2);
        let id = account.id;
        account.sent_today = 0;
        store.insert_account(account).await.unwrap();

        let now = Utc::now();
        assert!(store.try_increment_sent_today(id, now).await.unwrap());
        assert!(store.try_increment_sent_today(id, now).await.unwrap());
        assert!(!store.try_increment_sent_today(id, now).await.unwrap());

        let stored = store.account(id).await.unwrap().unwrap();
        assert_eq!(stored.sent_today, 2);
        assert_eq!(stored.last_connected_at, Some(now));
    }

    #[tokio::test]
    async fn daily_reset_zeroes_all_counters() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            let mut account = SendAccount::new("a@example.com", 10);
            account.sent_today = 7;
            store.insert_account(account).await.unwrap();
        }
        assert_eq!(store.reset_daily_counters().await.unwrap(), 3);
        for account in store.list_accounts().await.unwrap() {
            assert_eq!(account.sent_today, 0);
        }
    }

    #[tokio::test]
    async fn health_event_flows_through_rotation_scoring() {
        let store = MemoryStore::new();
        let account = SendAccount::new("a@example.com", 10);
        let id = account.id;
        store.insert_account(account).await.unwrap();

        let updated = store
            .record_health_event(id, HealthEvent::Error)
            .await
            .unwrap();
        assert_eq!(updated.health_score, 90);
        assert_eq!(updated.error_count, 1);
    }

    #[tokio::test]
    async fn webhook_store_view_filters_by_event() {
        let store = MemoryStore::new();
        let team = Uuid::new_v4();
        let sub = WebhookSubscription::new(
            team,
            "https://example.com/hook",
            "s",
            ["campaign.started".to_string()],
        );
        let sub_id = sub.id;
        store.insert_subscription(sub).await.unwrap();

        let matching = WebhookStore::subscriptions_for_event(&store, team, "campaign.started")
            .await
            .unwrap();
        assert_eq!(matching.len(), 1);
        let none = WebhookStore::subscriptions_for_event(&store, team, "campaign.completed")
            .await
            .unwrap();
        assert!(none.is_empty());

        let delivery = WebhookDelivery::record(
            sub_id,
            "campaign.started",
            "{}",
            Some(200),
            "ok",
            1,
            true,
        );
        WebhookStore::record_delivery(&store, delivery).await.unwrap();
        assert_eq!(store.deliveries_for(sub_id).await.unwrap().len(), 1);
    }
}
