//! Campaign lifecycle orchestration.
//!
//! The state machine behind start/pause/resume/complete, plus the
//! periodic sweep that discovers due prospects and hands sends to the
//! delivery queue.

pub mod error;
pub mod lifecycle;
pub mod sweep;


pub use error::OrchestratorError;
pub use lifecycle::{CommandOutcome, Orchestrator};
pub use sweep::SweepReport;

/// Webhook event fired when a campaign starts.
pub const EVENT_CAMPAIGN_STARTED: &str = "campaign.started";
/// Webhook event fired when a campaign pauses.
pub const EVENT_CAMPAIGN_PAUSED: &str = "campaign.paused";
/// Webhook event fired when a campaign resumes.
pub const EVENT_CAMPAIGN_RESUMED: &str = "campaign.resumed";
/// Webhook event fired when a campaign auto-completes.
pub const EVENT_CAMPAIGN_COMPLETED: &str = "campaign.completed";
