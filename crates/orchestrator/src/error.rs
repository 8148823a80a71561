//! Orchestrator error taxonomy.
//!
//! Precondition errors surface synchronously to the caller with nothing
//! mutated; store/queue errors bubble up from the infrastructure.

use cadence_core::CampaignStatus;
use cadence_queue::QueueError;
use cadence_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(Uuid),

    #[error("cannot {command} campaign in status {from:?}")]
    InvalidTransition {
        from: CampaignStatus,
        command: &'static str,
    },

    #[error("campaign has no email step")]
    NoEmailStep,

    #[error("campaign has no active sending account")]
    NoActiveAccount,

    #[error("campaign has no pending prospects")]
    NoPendingProspects,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl OrchestratorError {
    /// Whether this is a caller error (missing prerequisite or invalid
    /// transition) rather than an infrastructure failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            OrchestratorError::InvalidTransition { .. }
                | OrchestratorError::NoEmailStep
                | OrchestratorError::NoActiveAccount
                | OrchestratorError::NoPendingProspects
        )
    }
}
