//! Weighted account selection.
//!
//! Eligible accounts are drawn with probability proportional to
//! `health_score × remaining_capacity / daily_limit`, so healthy
//! accounts with headroom absorb more of the load. Draws use the
//! cumulative-weight method.

use cadence_core::SendAccount;
use rand::Rng;

/// An account is a rotation candidate iff it is active and under its
/// daily cap.
pub fn is_eligible(account: &SendAccount) -> bool {
    account.is_active && account.sent_today < account.daily_limit
}

/// Selection weight for an eligible account.
pub fn rotation_weight(account: &SendAccount) -> f64 {
    account.health_score as f64 * account.remaining_capacity() as f64
        / account.daily_limit as f64
}

/// Weighted random draw over the eligible candidates.
///
/// Falls back to the first eligible candidate when every weight is zero
/// (all-zero health). Returns `None` when no account is eligible — the
/// caller skips or delays, it does not fail loudly.
pub fn select_account(accounts: &[SendAccount]) -> Option<&SendAccount> {
    select_account_with(accounts, &mut rand::thread_rng())
}

/// [`select_account`] with an injected rng, for deterministic tests.
pub fn select_account_with<'a, R: Rng>(
    accounts: &'a [SendAccount],
    rng: &mut R,
) -> Option<&'a SendAccount> {
    let eligible: Vec<&SendAccount> = accounts.iter().filter(|a| is_eligible(a)).collect();
    let first = *eligible.first()?;

    let total: f64 = eligible.iter().map(|a| rotation_weight(a)).sum();
    if total <= 0.0 {
        return Some(first);
    }

    let mut draw = rng.gen_range(0.0..total);
    for account in &eligible {
        let weight = rotation_weight(account);
        if draw < weight {
            return Some(account);
        }
        draw -= weight;
    }

    // Floating-point tail: the draw consumed the whole range.
    eligible.last().copied()
}
