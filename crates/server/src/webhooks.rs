//! Webhook subscription registration and the delivery audit trail.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use cadence_store::Store;
use cadence_webhook::{WebhookDelivery, WebhookSubscription};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub team_id: Uuid,
    pub url: String,
    pub secret: String,
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsParams {
    pub team_id: Uuid,
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    warn!(error = %e, "store operation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Subscribe an endpoint to campaign events.
#[utoipa::path(
    post,
    path = "/webhooks",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Subscription created", body = Object)
    )
)]
pub(crate) async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<Json<WebhookSubscription>, (StatusCode, String)> {
    let subscription = WebhookSubscription::new(
        request.team_id,
        request.url,
        request.secret,
        request.events,
    );
    state
        .store
        .insert_subscription(subscription.clone())
        .await
        .map_err(internal)?;
    Ok(Json(subscription))
}

/// List a team's subscriptions.
#[utoipa::path(
    get,
    path = "/webhooks",
    tag = "Webhooks",
    params(("team_id" = String, Query, description = "Team ID")),
    responses(
        (status = 200, description = "Subscriptions", body = Object)
    )
)]
pub(crate) async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSubscriptionsParams>,
) -> Result<Json<Vec<WebhookSubscription>>, (StatusCode, String)> {
    let subscriptions = state
        .store
        .list_subscriptions(params.team_id)
        .await
        .map_err(internal)?;
    Ok(Json(subscriptions))
}

/// Delivery attempts recorded for one subscription, oldest first.
#[utoipa::path(
    get,
    path = "/webhooks/{id}/deliveries",
    tag = "Webhooks",
    params(("id" = String, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Delivery records", body = Object)
    )
)]
pub(crate) async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<WebhookDelivery>>, (StatusCode, String)> {
    let deliveries = state.store.deliveries_for(id).await.map_err(internal)?;
    Ok(Json(deliveries))
}
