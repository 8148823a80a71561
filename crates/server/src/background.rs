//! Background task wiring: the periodic sweep and the daily
//! `sent_today` reset.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Timelike, Utc};
use tracing::{info, warn};

use cadence_store::Store;

use crate::state::AppState;

/// Spawn every background loop the scheduler needs.
pub fn spawn_background_tasks(state: &Arc<AppState>) {
    state
        .orchestrator
        .clone()
        .spawn_sweep_loop(Duration::from_secs(state.config.sweep.interval_secs));

    spawn_daily_reset(state.store.clone(), state.config.sweep.daily_reset_hour);
}

/// Reset per-account daily counters once a day at the configured UTC
/// hour.
fn spawn_daily_reset(store: Arc<dyn Store>, reset_hour: u8) {
    tokio::spawn(async move {
        loop {
            let wait = seconds_until_next_utc_hour(reset_hour);
            tokio::time::sleep(Duration::from_secs(wait)).await;
            match store.reset_daily_counters().await {
                Ok(count) => info!(accounts = count, "daily send counters reset"),
                Err(e) => warn!(error = %e, "daily counter reset failed"),
            }
        }
    });
}

/// Seconds from now until the next occurrence of `hour:00` UTC.
fn seconds_until_next_utc_hour(hour: u8) -> u64 {
    let now = Utc::now();
    let today_target = now
        .date_naive()
        .and_hms_opt(hour as u32, 0, 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default());
    let target = if now.time().hour() >= hour as u32 {
        today_target + ChronoDuration::days(1)
    } else {
        today_target
    };
    (target - now.naive_utc()).num_seconds().max(1) as u64
}
