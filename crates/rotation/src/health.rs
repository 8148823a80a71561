//! Reputation scoring for sending accounts.
//!
//! The score is a 0–100 proxy for deliverability, decayed by bounces,
//! spam reports, and send errors. Weights: bounces ×2, spam reports ×5,
//! errors ×10 — applied uniformly everywhere the score is recomputed,
//! including the daily aggregation pass.

use cadence_core::SendAccount;
use tracing::warn;

/// Score below which an account is pulled out of rotation.
pub const DEACTIVATION_THRESHOLD: u8 = 30;

/// A reputation-affecting delivery outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEvent {
    Bounce,
    SpamReport,
    Error,
}

/// Record one event against the account and refresh its score.
///
/// Idempotent to re-run only in the sense that each call is an
/// independent per-row update; callers retrying a failed batch must not
/// replay events they already applied.
pub fn apply_health_event(account: &mut SendAccount, event: HealthEvent) {
    match event {
        HealthEvent::Bounce => account.bounce_count += 1,
        HealthEvent::SpamReport => account.spam_report_count += 1,
        HealthEvent::Error => account.error_count += 1,
    }
    recompute_health(account);
}

/// Recompute `health_score` from the raw counters, auto-deactivating the
/// account when it falls below [`DEACTIVATION_THRESHOLD`].
pub fn recompute_health(account: &mut SendAccount) {
    let penalty = account.bounce_count as u64 * 2
        + account.spam_report_count as u64 * 5
        + account.error_count as u64 * 10;
    account.health_score = 100u64.saturating_sub(penalty) as u8;

    if account.health_score < DEACTIVATION_THRESHOLD && account.is_active {
        warn!(
            account_id = %account.id,
            email = %account.email,
            health_score = account.health_score,
            "account health below threshold, deactivating"
        );
        account.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_match_documented_formula() {
        let mut account = SendAccount::new("a@example.com", 100);
        account.bounce_count = 3;
        account.spam_report_count = 2;
        account.error_count = 1;
        recompute_health(&mut account);
        // 100 - 3*2 - 2*5 - 1*10 = 74
        assert_eq!(account.health_score, 74);
        assert!(account.is_active);
    }

    #[test]
    fn score_floors_at_zero() {
        let mut account = SendAccount::new("a@example.com", 100);
        account.error_count = 50;
        recompute_health(&mut account);
        assert_eq!(account.health_score, 0);
    }

    #[test]
    fn events_increment_their_counter() {
        let mut account = SendAccount::new("a@example.com", 100);
        apply_health_event(&mut account, HealthEvent::Bounce);
        apply_health_event(&mut account, HealthEvent::SpamReport);
        apply_health_event(&mut account, HealthEvent::Error);
        assert_eq!(account.bounce_count, 1);
        assert_eq!(account.spam_report_count, 1);
        assert_eq!(account.error_count, 1);
        assert_eq!(account.health_score, 100 - 2 - 5 - 10);
    }

    #[test]
    fn crossing_threshold_deactivates() {
        let mut account = SendAccount::new("a@example.com", 100);
        // 7 errors: 100 - 70 = 30, still active (threshold is strict).
        for _ in 0..7 {
            apply_health_event(&mut account, HealthEvent::Error);
        }
        assert_eq!(account.health_score, 30);
        assert!(account.is_active);

        // One more pushes below 30.
        apply_health_event(&mut account, HealthEvent::Error);
        assert_eq!(account.health_score, 20);
        assert!(!account.is_active);
    }
}
