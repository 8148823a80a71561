//! Lifecycle commands: start, pause, resume.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use cadence_core::{
    compute_next_send, Campaign, CampaignStatus, Prospect, ProspectStatus,
};
use cadence_queue::{DeliveryQueue, EnqueueOpts, SendJob, SEND_QUEUE};
use cadence_store::Store;
use cadence_webhook::WebhookDispatcher;

use crate::error::OrchestratorError;
use crate::{EVENT_CAMPAIGN_PAUSED, EVENT_CAMPAIGN_RESUMED, EVENT_CAMPAIGN_STARTED};

/// Minutes between consecutive staggered sends.
pub(crate) const STAGGER_MINUTES: i64 = 2;

/// What a lifecycle command did.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOutcome {
    /// Jobs enqueued by the command.
    pub enqueued: usize,
    /// Queued jobs removed (pause only).
    pub removed_jobs: usize,
}

/// Coordinates the store, delivery queue, and webhook fan-out.
///
/// All coordination is scoped to single campaign/prospect/account rows;
/// there are no global locks, so commands and the sweep can run
/// concurrently.
pub struct Orchestrator {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) queue: Arc<dyn DeliveryQueue>,
    pub(crate) webhooks: Arc<WebhookDispatcher>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn DeliveryQueue>,
        webhooks: Arc<WebhookDispatcher>,
    ) -> Self {
        Self {
            store,
            queue,
            webhooks,
        }
    }

    /// Start a draft campaign: schedule every pending prospect and hand
    /// one send job per prospect to the delivery queue.
    pub async fn start_campaign(&self, id: Uuid) -> Result<CommandOutcome, OrchestratorError> {
        self.start_campaign_at(id, Utc::now()).await
    }

    pub async fn start_campaign_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, OrchestratorError> {
        let campaign = self.require_campaign(id).await?;
        if campaign.status != CampaignStatus::Draft {
            return Err(OrchestratorError::InvalidTransition {
                from: campaign.status,
                command: "start",
            });
        }

        // Preconditions, checked before anything is mutated.
        let first_step = campaign
            .first_email_step()
            .ok_or(OrchestratorError::NoEmailStep)?;
        let account = self
            .store
            .account(campaign.account_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or(OrchestratorError::NoActiveAccount)?;
        let pending = self
            .store
            .prospects_with_status(id, ProspectStatus::Pending)
            .await?;
        if pending.is_empty() {
            return Err(OrchestratorError::NoPendingProspects);
        }

        if !self
            .store
            .compare_and_set_campaign_status(id, CampaignStatus::Draft, CampaignStatus::Active)
            .await?
        {
            // Someone else won the transition between our read and the CAS.
            return Err(OrchestratorError::InvalidTransition {
                from: CampaignStatus::Draft,
                command: "start",
            });
        }

        let daily_limit = campaign.daily_limit.max(1) as usize;
        let mut window_base_by_day: Vec<Option<DateTime<Utc>>> = Vec::new();
        let mut enqueued = 0usize;

        for (n, prospect) in pending.iter().enumerate() {
            let day_offset = n / daily_limit;
            let slot = (n % daily_limit) as i64;

            // One window calculation per day offset; every prospect in
            // that day shares the base and spreads out by slot.
            if window_base_by_day.len() <= day_offset {
                window_base_by_day.resize(day_offset + 1, None);
            }
            let base = match window_base_by_day[day_offset] {
                Some(base) => base,
                None => {
                    let base = compute_next_send(
                        now + Duration::days(day_offset as i64),
                        0,
                        0,
                        &campaign.schedule,
                    );
                    window_base_by_day[day_offset] = Some(base);
                    base
                }
            };
            let send_at = base + Duration::minutes(STAGGER_MINUTES * slot);

            self.schedule_and_enqueue(&campaign, prospect, first_step, send_at, now)
                .await?;
            enqueued += 1;
        }

        info!(
            campaign_id = %id,
            prospects = enqueued,
            account = %account.email,
            "campaign started"
        );
        self.fire_event(
            &campaign,
            EVENT_CAMPAIGN_STARTED,
            serde_json::json!({ "campaign_id": id, "enqueued": enqueued }),
        )
        .await;

        Ok(CommandOutcome {
            enqueued,
            removed_jobs: 0,
        })
    }

    /// Pause an active campaign: flip status, pull every not-yet-claimed
    /// job of the campaign out of the queue, and park in-flight
    /// prospects. Jobs a worker already claimed are not recalled.
    pub async fn pause_campaign(&self, id: Uuid) -> Result<CommandOutcome, OrchestratorError> {
        let campaign = self.require_campaign(id).await?;
        if campaign.status != CampaignStatus::Active {
            return Err(OrchestratorError::InvalidTransition {
                from: campaign.status,
                command: "pause",
            });
        }
        if !self
            .store
            .compare_and_set_campaign_status(id, CampaignStatus::Active, CampaignStatus::Paused)
            .await?
        {
            return Err(OrchestratorError::InvalidTransition {
                from: CampaignStatus::Active,
                command: "pause",
            });
        }

        let removed_jobs = self.remove_campaign_jobs(id).await?;

        let sending = self
            .store
            .prospects_with_status(id, ProspectStatus::Sending)
            .await?;
        for prospect in &sending {
            self.store
                .compare_and_set_prospect_status(
                    prospect.id,
                    ProspectStatus::Sending,
                    ProspectStatus::Paused,
                )
                .await?;
        }

        info!(
            campaign_id = %id,
            removed_jobs,
            parked_prospects = sending.len(),
            "campaign paused"
        );
        self.fire_event(
            &campaign,
            EVENT_CAMPAIGN_PAUSED,
            serde_json::json!({ "campaign_id": id, "removed_jobs": removed_jobs }),
        )
        .await;

        Ok(CommandOutcome {
            enqueued: 0,
            removed_jobs,
        })
    }

    /// Resume a paused campaign: advance parked prospects to their next
    /// email step (completing those with none left) and re-issue the
    /// jobs pause removed, staggered to avoid a burst.
    pub async fn resume_campaign(&self, id: Uuid) -> Result<CommandOutcome, OrchestratorError> {
        self.resume_campaign_at(id, Utc::now()).await
    }

    pub async fn resume_campaign_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, OrchestratorError> {
        let campaign = self.require_campaign(id).await?;
        if campaign.status != CampaignStatus::Paused {
            return Err(OrchestratorError::InvalidTransition {
                from: campaign.status,
                command: "resume",
            });
        }
        if !self
            .store
            .compare_and_set_campaign_status(id, CampaignStatus::Paused, CampaignStatus::Active)
            .await?
        {
            return Err(OrchestratorError::InvalidTransition {
                from: CampaignStatus::Paused,
                command: "resume",
            });
        }

        let mut enqueued = 0usize;
        let mut stagger = 0i64;
        let mut completed = 0usize;

        // Parked prospects move on to the email step after the one that
        // was in flight when the campaign paused.
        let paused = self
            .store
            .prospects_with_status(id, ProspectStatus::Paused)
            .await?;
        for prospect in &paused {
            match campaign.next_email_step_after(prospect.current_step) {
                None => {
                    self.store
                        .compare_and_set_prospect_status(
                            prospect.id,
                            ProspectStatus::Paused,
                            ProspectStatus::Completed,
                        )
                        .await?;
                    completed += 1;
                }
                Some(step_index) => {
                    let step = &campaign.steps[step_index];
                    let send_at =
                        compute_next_send(now, step.delay_days, step.delay_hours, &campaign.schedule)
                            + Duration::minutes(STAGGER_MINUTES * stagger);
                    self.schedule_and_enqueue(&campaign, prospect, step_index, send_at, now)
                        .await?;
                    stagger += 1;
                    enqueued += 1;
                }
            }
        }

        // Pending prospects kept their position, but pause removed their
        // queued jobs; re-issue them. Future schedules are kept as-is,
        // elapsed ones are recomputed into the window.
        let pending = self
            .store
            .prospects_with_status(id, ProspectStatus::Pending)
            .await?;
        for prospect in &pending {
            let send_at = match prospect.next_scheduled_at {
                Some(at) if at > now => at,
                _ => {
                    let send_at = compute_next_send(now, 0, 0, &campaign.schedule)
                        + Duration::minutes(STAGGER_MINUTES * stagger);
                    stagger += 1;
                    send_at
                }
            };
            self.schedule_and_enqueue(&campaign, prospect, prospect.current_step, send_at, now)
                .await?;
            enqueued += 1;
        }

        info!(
            campaign_id = %id,
            enqueued,
            completed_prospects = completed,
            "campaign resumed"
        );
        self.fire_event(
            &campaign,
            EVENT_CAMPAIGN_RESUMED,
            serde_json::json!({ "campaign_id": id, "enqueued": enqueued }),
        )
        .await;

        Ok(CommandOutcome {
            enqueued,
            removed_jobs: 0,
        })
    }

    // ── Shared helpers ──────────────────────────────────────────

    pub(crate) async fn require_campaign(
        &self,
        id: Uuid,
    ) -> Result<Campaign, OrchestratorError> {
        self.store
            .campaign(id)
            .await?
            .ok_or(OrchestratorError::CampaignNotFound(id))
    }

    /// Write the prospect's position first, then enqueue the idempotent
    /// job — a crash in between is recovered by re-issuing the same id.
    pub(crate) async fn schedule_and_enqueue(
        &self,
        campaign: &Campaign,
        prospect: &Prospect,
        step_index: usize,
        send_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        self.store
            .update_prospect_schedule(prospect.id, ProspectStatus::Pending, step_index, Some(send_at))
            .await?;

        let job = SendJob {
            prospect_id: prospect.id,
            campaign_id: campaign.id,
            step_index,
            account_id: campaign.account_id,
        };
        let delay = (send_at - now).to_std().unwrap_or(StdDuration::ZERO);
        self.queue
            .enqueue(
                SEND_QUEUE,
                serde_json::to_value(&job)
                    .map_err(|e| cadence_queue::QueueError::Payload(e.to_string()))?,
                EnqueueOpts {
                    job_id: Some(job.dedup_id()),
                    delay: Some(delay),
                    priority: None,
                },
            )
            .await?;
        Ok(())
    }

    /// Pull every pending job belonging to the campaign out of the send
    /// queue. Returns how many were removed.
    async fn remove_campaign_jobs(&self, campaign_id: Uuid) -> Result<usize, OrchestratorError> {
        let mut jobs = self.queue.list_delayed(SEND_QUEUE).await?;
        jobs.extend(self.queue.list_waiting(SEND_QUEUE).await?);

        let mut removed = 0usize;
        for job in jobs {
            let belongs = job
                .parse_payload::<SendJob>()
                .map(|send| send.campaign_id == campaign_id)
                .unwrap_or(false);
            if belongs && self.queue.remove(&job.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Fire-and-forget webhook fan-out; a notification failure never
    /// fails the command that triggered it.
    pub(crate) async fn fire_event(
        &self,
        campaign: &Campaign,
        event: &str,
        data: serde_json::Value,
    ) {
        if let Err(e) = self.webhooks.dispatch(campaign.team_id, event, data).await {
            warn!(
                campaign_id = %campaign.id,
                event,
                error = %e,
                "webhook dispatch failed"
            );
        }
    }
}
