//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("payload serialization error: {0}")]
    Payload(String),

    #[error("backend error: {0}")]
    Backend(String),
}
