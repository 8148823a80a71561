//! The periodic sweep over active campaigns.
//!
//! Runs on a fixed interval, independent of user action. Each campaign
//! is processed in isolation — one campaign's failure never aborts the
//! sweep for the rest — and its status is re-read fresh at the start of
//! its iteration so a concurrent pause wins cleanly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cadence_core::{is_within_window, CampaignStatus, ProspectStatus};
use cadence_queue::{DeliveryQueue, EnqueueOpts, SendJob, SEND_QUEUE};
use cadence_rotation::is_eligible;
use cadence_store::Store;

use crate::error::OrchestratorError;
use crate::lifecycle::Orchestrator;
use crate::EVENT_CAMPAIGN_COMPLETED;

/// Per-sweep cap on sends enqueued for a single campaign, on top of the
/// campaign and account daily limits.
const SWEEP_BATCH_CAP: usize = 10;

/// Aggregate result of one sweep pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    pub campaigns_seen: usize,
    pub jobs_enqueued: usize,
    pub campaigns_completed: usize,
    pub failures: usize,
}

impl Orchestrator {
    /// One pass over every active campaign.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_once_at(Utc::now()).await
    }

    pub async fn sweep_once_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let campaigns = match self.store.campaigns_with_status(CampaignStatus::Active).await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                warn!(error = %e, "sweep: active-campaign scan failed");
                report.failures += 1;
                return report;
            }
        };

        for campaign in campaigns {
            report.campaigns_seen += 1;
            match self.sweep_campaign(campaign.id, now).await {
                Ok(outcome) => {
                    report.jobs_enqueued += outcome.enqueued;
                    if outcome.completed {
                        report.campaigns_completed += 1;
                    }
                }
                Err(e) => {
                    // Catch-and-continue: isolate this campaign's failure.
                    warn!(
                        campaign_id = %campaign.id,
                        error = %e,
                        "sweep: campaign processing failed, continuing"
                    );
                    report.failures += 1;
                }
            }
        }

        if report.jobs_enqueued > 0 || report.failures > 0 {
            info!(
                campaigns = report.campaigns_seen,
                enqueued = report.jobs_enqueued,
                completed = report.campaigns_completed,
                failures = report.failures,
                "sweep finished"
            );
        }
        report
    }

    /// Process one campaign: auto-complete, window and capacity gates,
    /// then enqueue up to the batch cap of due prospects.
    pub(crate) async fn sweep_campaign(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CampaignSweep, OrchestratorError> {
        // Fresh status read: a pause that landed after the scan must not
        // have its removed jobs re-created here.
        let Some(campaign) = self.store.campaign(id).await? else {
            return Ok(CampaignSweep::default());
        };
        if campaign.status != CampaignStatus::Active {
            return Ok(CampaignSweep::default());
        }

        // Auto-complete: nothing left in the sending flow.
        if self.store.count_schedulable_prospects(id).await? == 0 {
            if self
                .store
                .compare_and_set_campaign_status(id, CampaignStatus::Active, CampaignStatus::Completed)
                .await?
            {
                info!(campaign_id = %id, "campaign completed");
                self.fire_event(
                    &campaign,
                    EVENT_CAMPAIGN_COMPLETED,
                    serde_json::json!({ "campaign_id": id }),
                )
                .await;
                return Ok(CampaignSweep {
                    enqueued: 0,
                    completed: true,
                });
            }
            return Ok(CampaignSweep::default());
        }

        // Cheap per-campaign filter before any prospect queries.
        if !is_within_window(&campaign.schedule, now) {
            return Ok(CampaignSweep::default());
        }

        let Some(account) = self.store.account(campaign.account_id).await? else {
            debug!(campaign_id = %id, "sweep: owning account missing, skipping");
            return Ok(CampaignSweep::default());
        };
        if !is_eligible(&account) {
            debug!(
                campaign_id = %id,
                account = %account.email,
                sent_today = account.sent_today,
                "sweep: account ineligible, skipping"
            );
            return Ok(CampaignSweep::default());
        }

        // Caps per-campaign and per-account burst size, independent of
        // how many prospects are technically due.
        let batch = (campaign.daily_limit as usize)
            .min(account.remaining_capacity() as usize)
            .min(SWEEP_BATCH_CAP);

        let due = self.store.due_prospects(id, now, batch).await?;
        let mut enqueued = 0usize;
        for prospect in due {
            // Mark before enqueue; losing the race (e.g. to a concurrent
            // pause) just skips the prospect.
            if !self
                .store
                .compare_and_set_prospect_status(
                    prospect.id,
                    ProspectStatus::Pending,
                    ProspectStatus::Sending,
                )
                .await?
            {
                continue;
            }

            let job = SendJob {
                prospect_id: prospect.id,
                campaign_id: id,
                step_index: prospect.current_step,
                account_id: campaign.account_id,
            };
            self.queue
                .enqueue(
                    SEND_QUEUE,
                    serde_json::to_value(&job)
                        .map_err(|e| cadence_queue::QueueError::Payload(e.to_string()))?,
                    EnqueueOpts {
                        job_id: Some(job.dedup_id()),
                        delay: None,
                        priority: None,
                    },
                )
                .await?;
            enqueued += 1;
        }

        Ok(CampaignSweep {
            enqueued,
            completed: false,
        })
    }

    /// Spawn the sweep loop on a fixed interval.
    pub fn spawn_sweep_loop(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "sweep loop started");
            loop {
                ticker.tick().await;
                let report = self.sweep_once().await;
                debug!(
                    campaigns = report.campaigns_seen,
                    enqueued = report.jobs_enqueued,
                    "sweep tick"
                );
            }
        })
    }
}

/// Outcome of sweeping one campaign.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CampaignSweep {
    pub enqueued: usize,
    pub completed: bool,
}
