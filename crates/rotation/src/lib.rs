//! Account rotation: health scoring and weighted selection over the
//! pool of candidate sending accounts.

pub mod health;
pub mod selection;

pub use health::{apply_health_event, recompute_health, HealthEvent, DEACTIVATION_THRESHOLD};
pub use selection::{is_eligible, rotation_weight, select_account, select_account_with};
