//! Seams the dispatcher depends on: endpoint transport and persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::sender::EndpointResponse;
use crate::types::{WebhookDelivery, WebhookSubscription};

/// Errors that can occur during webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payload serialization failed: {0}")]
    Serialize(String),

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("store error: {0}")]
    Store(String),
}

/// A prepared outbound request: signed body plus headers.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub event: String,
    pub timestamp: String,
    pub signature: String,
    pub body: String,
}

/// Transport for one webhook POST.
///
/// The production implementation is [`crate::HttpSender`]; tests swap in
/// mocks that fail on script.
#[async_trait]
pub trait EndpointSender: Send + Sync {
    /// Deliver the request, returning the endpoint's status and body.
    ///
    /// `Err` means the request produced no HTTP response at all
    /// (timeout, refused connection, DNS failure).
    async fn send(&self, request: &SignedRequest) -> Result<EndpointResponse, WebhookError>;
}

/// Persistence the dispatcher needs: subscription lookup and the
/// per-attempt delivery audit trail.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Active subscriptions of the team that want `event`.
    async fn subscriptions_for_event(
        &self,
        team_id: Uuid,
        event: &str,
    ) -> Result<Vec<WebhookSubscription>, WebhookError>;

    /// Append one delivery-attempt record.
    async fn record_delivery(&self, delivery: WebhookDelivery) -> Result<(), WebhookError>;
}
