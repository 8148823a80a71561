pub mod backend;
pub mod error;
pub mod job;
pub mod memory;
pub mod policy;

pub use backend::{DeliveryQueue, EnqueueOpts, QueueStats};
pub use error::QueueError;
pub use job::{Job, JobState, SendJob, REPLY_CHECK_QUEUE, SEND_QUEUE};
pub use memory::MemoryQueue;
pub use policy::{Backoff, RetryPolicy};
