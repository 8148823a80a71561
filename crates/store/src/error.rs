//! Store error types.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(Uuid),

    #[error("prospect not found: {0}")]
    ProspectNotFound(Uuid),

    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("backend error: {0}")]
    Backend(String),
}
