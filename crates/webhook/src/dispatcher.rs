//! Fans events out to subscribed endpoints.
//!
//! Each matching subscription gets its own spawned delivery task, so one
//! slow or dead endpoint never blocks the others — or the caller of
//! [`WebhookDispatcher::dispatch`]. Every attempt is recorded; after the
//! retry budget is spent the last failed record is the terminal state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::signer;
use crate::traits::{EndpointSender, SignedRequest, WebhookError, WebhookStore};
use crate::types::{EventPayload, WebhookDelivery, WebhookSubscription};

/// Total attempts per endpoint, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Linear backoff unit: the n-th failure waits `n × unit`.
const BACKOFF_UNIT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct WebhookDispatcher {
    sender: Arc<dyn EndpointSender>,
    store: Arc<dyn WebhookStore>,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl WebhookDispatcher {
    pub fn new(sender: Arc<dyn EndpointSender>, store: Arc<dyn WebhookStore>) -> Self {
        Self {
            sender,
            store,
            max_attempts: MAX_ATTEMPTS,
            backoff_unit: BACKOFF_UNIT,
        }
    }

    /// Shrink the backoff unit (tests).
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Notify every matching subscription of `event`.
    ///
    /// Returns the number of endpoints targeted. Delivery (and its
    /// retries) runs in background tasks; the call returns once the
    /// fan-out is recorded, not once endpoints answered.
    pub async fn dispatch(
        &self,
        team_id: Uuid,
        event: &str,
        data: serde_json::Value,
    ) -> Result<usize, WebhookError> {
        let subscriptions = self.store.subscriptions_for_event(team_id, event).await?;
        if subscriptions.is_empty() {
            debug!(team_id = %team_id, event, "no active webhook subscriptions");
            return Ok(0);
        }

        let payload = EventPayload {
            event: event.to_string(),
            timestamp: Utc::now(),
            data,
        };
        let body = serde_json::to_string(&payload)
            .map_err(|e| WebhookError::Serialize(e.to_string()))?;

        let targeted = subscriptions.len();
        for subscription in subscriptions {
            let dispatcher = self.clone();
            let event = payload.event.clone();
            let body = body.clone();
            let timestamp = payload.timestamp.to_rfc3339();
            tokio::spawn(async move {
                dispatcher
                    .deliver(&subscription, &event, &body, &timestamp)
                    .await;
            });
        }
        Ok(targeted)
    }

    /// Run the full retry loop against one subscription.
    ///
    /// Returns whether any attempt succeeded. Public so callers that
    /// need delivery confirmation (and tests) can await it directly.
    pub async fn deliver(
        &self,
        subscription: &WebhookSubscription,
        event: &str,
        body: &str,
        timestamp: &str,
    ) -> bool {
        let signature = match signer::sign(&subscription.secret, body.as_bytes()) {
            Ok(sig) => sig,
            Err(e) => {
                warn!(webhook_id = %subscription.id, error = %e, "payload signing failed");
                return false;
            }
        };
        let request = SignedRequest {
            url: subscription.url.clone(),
            event: event.to_string(),
            timestamp: timestamp.to_string(),
            signature,
            body: body.to_string(),
        };

        for attempt in 1..=self.max_attempts {
            let outcome = self.sender.send(&request).await;
            let (status, response, success) = match &outcome {
                Ok(r) => (Some(r.status), r.body.clone(), r.is_success()),
                Err(e) => (None, e.to_string(), false),
            };

            let record = WebhookDelivery::record(
                subscription.id,
                event,
                body,
                status,
                &response,
                attempt,
                success,
            );
            if let Err(e) = self.store.record_delivery(record).await {
                warn!(webhook_id = %subscription.id, error = %e, "failed to record delivery attempt");
            }

            if success {
                debug!(
                    webhook_id = %subscription.id,
                    url = %subscription.url,
                    attempt,
                    "webhook delivered"
                );
                return true;
            }

            warn!(
                webhook_id = %subscription.id,
                url = %subscription.url,
                attempt,
                status = ?status,
                "webhook delivery attempt failed"
            );

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff_unit * attempt).await;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::EndpointResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Sender that answers from a fixed script of statuses, `None`
    /// meaning a transport failure.
    struct ScriptedSender {
        script: Vec<Option<u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedSender {
        fn new(script: Vec<Option<u16>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl EndpointSender for ScriptedSender {
        async fn send(&self, _request: &SignedRequest) -> Result<EndpointResponse, WebhookError> {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            match self.script.get(n).copied().flatten() {
                Some(status) => Ok(EndpointResponse {
                    status,
                    body: format!("status {status}"),
                }),
                None => Err(WebhookError::Store("connection refused".to_string())),
            }
        }
    }

    /// Store with a fixed subscription set and an in-memory audit trail.
    struct RecordingStore {
        subscriptions: Vec<WebhookSubscription>,
        deliveries: Mutex<Vec<WebhookDelivery>>,
    }

    impl RecordingStore {
        fn new(subscriptions: Vec<WebhookSubscription>) -> Self {
            Self {
                subscriptions,
                deliveries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WebhookStore for RecordingStore {
        async fn subscriptions_for_event(
            &self,
            team_id: Uuid,
            event: &str,
        ) -> Result<Vec<WebhookSubscription>, WebhookError> {
            Ok(self
                .subscriptions
                .iter()
                .filter(|s| s.team_id == team_id && s.wants(event))
                .cloned()
                .collect())
        }

        async fn record_delivery(&self, delivery: WebhookDelivery) -> Result<(), WebhookError> {
            self.deliveries.lock().await.push(delivery);
            Ok(())
        }
    }

    fn subscription(team_id: Uuid) -> WebhookSubscription {
        WebhookSubscription::new(
            team_id,
            "https://example.com/hook",
            "s3cret",
            ["campaign.started".to_string()],
        )
    }

    fn dispatcher(
        sender: Arc<ScriptedSender>,
        store: Arc<RecordingStore>,
    ) -> Arc<WebhookDispatcher> {
        Arc::new(
            WebhookDispatcher::new(sender, store).with_backoff_unit(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn success_on_first_attempt_records_one_delivery() {
        let team = Uuid::new_v4();
        let sub = subscription(team);
        let sender = Arc::new(ScriptedSender::new(vec![Some(200)]));
        let store = Arc::new(RecordingStore::new(vec![sub.clone()]));
        let dispatcher = dispatcher(sender.clone(), store.clone());

        let delivered = dispatcher
            .deliver(&sub, "campaign.started", "{}", "2025-06-10T09:00:00Z")
            .await;
        assert!(delivered);
        assert_eq!(sender.call_count(), 1);

        let deliveries = store.deliveries.lock().await;
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].success);
        assert_eq!(deliveries[0].status, Some(200));
        assert_eq!(deliveries[0].attempt, 1);
    }

    #[tokio::test]
    async fn three_failures_record_three_attempts_and_stop() {
        let team = Uuid::new_v4();
        let sub = subscription(team);
        let sender = Arc::new(ScriptedSender::new(vec![Some(500), None, Some(503), Some(200)]));
        let store = Arc::new(RecordingStore::new(vec![sub.clone()]));
        let dispatcher = dispatcher(sender.clone(), store.clone());

        let delivered = dispatcher
            .deliver(&sub, "campaign.started", "{}", "2025-06-10T09:00:00Z")
            .await;
        assert!(!delivered);
        // The scripted 4th response (200) is never requested.
        assert_eq!(sender.call_count(), 3);

        let deliveries = store.deliveries.lock().await;
        assert_eq!(deliveries.len(), 3);
        assert!(deliveries.iter().all(|d| !d.success));
        assert_eq!(
            deliveries.iter().map(|d| d.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        // Transport failure leaves no status; HTTP failures keep theirs.
        assert_eq!(deliveries[0].status, Some(500));
        assert_eq!(deliveries[1].status, None);
        assert_eq!(deliveries[2].status, Some(503));
    }

    #[tokio::test]
    async fn retry_succeeds_mid_sequence() {
        let team = Uuid::new_v4();
        let sub = subscription(team);
        let sender = Arc::new(ScriptedSender::new(vec![Some(500), Some(204)]));
        let store = Arc::new(RecordingStore::new(vec![sub.clone()]));
        let dispatcher = dispatcher(sender.clone(), store.clone());

        let delivered = dispatcher
            .deliver(&sub, "campaign.started", "{}", "2025-06-10T09:00:00Z")
            .await;
        assert!(delivered);
        assert_eq!(sender.call_count(), 2);

        let deliveries = store.deliveries.lock().await;
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries[1].success);
    }

    #[tokio::test]
    async fn dispatch_targets_only_matching_subscriptions() {
        let team = Uuid::new_v4();
        let matching = subscription(team);
        let other_team = subscription(Uuid::new_v4());
        let mut inactive = subscription(team);
        inactive.is_active = false;
        let mut wrong_event = subscription(team);
        wrong_event.events = ["campaign.paused".to_string()].into_iter().collect();

        let sender = Arc::new(ScriptedSender::new(vec![Some(200); 8]));
        let store = Arc::new(RecordingStore::new(vec![
            matching,
            other_team,
            inactive,
            wrong_event,
        ]));
        let dispatcher = dispatcher(sender, store);

        let targeted = dispatcher
            .dispatch(team, "campaign.started", serde_json::json!({"id": 1}))
            .await
            .unwrap();
        assert_eq!(targeted, 1);
    }
}
