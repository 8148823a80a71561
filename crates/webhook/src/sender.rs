//! HTTP endpoint transport.

use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{EndpointSender, SignedRequest, WebhookError};

/// Per-request timeout for endpoint delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What an endpoint answered.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: String,
}

impl EndpointResponse {
    /// 2xx means the endpoint accepted the event.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reqwest-backed [`EndpointSender`] with a shared connection pool.
#[derive(Debug)]
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointSender for HttpSender {
    async fn send(&self, request: &SignedRequest) -> Result<EndpointResponse, WebhookError> {
        let response = self
            .client
            .post(&request.url)
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Webhook-Signature", &request.signature)
            .header("X-Webhook-Event", &request.event)
            .header("X-Webhook-Timestamp", &request.timestamp)
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(EndpointResponse { status, body })
    }
}
