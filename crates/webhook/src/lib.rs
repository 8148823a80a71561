//! Outbound webhook delivery.
//!
//! Builds signed event payloads and delivers them to subscribed
//! endpoints with bounded retries, recording every attempt for audit.

pub mod dispatcher;
pub mod sender;
pub mod signer;
pub mod traits;
pub mod types;

pub use dispatcher::WebhookDispatcher;
pub use sender::{EndpointResponse, HttpSender};
pub use traits::{EndpointSender, SignedRequest, WebhookError, WebhookStore};
pub use types::{EventPayload, WebhookDelivery, WebhookSubscription};
