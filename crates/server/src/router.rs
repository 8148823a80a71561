//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::state::AppState;
use crate::{accounts, campaigns, queues, webhooks};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cadence",
        description = "Multi-step outreach campaign scheduler"
    ),
    paths(
        queues::health,
        queues::queue_stats,
        campaigns::crud::create_campaign,
        campaigns::crud::list_campaigns,
        campaigns::crud::get_campaign,
        campaigns::crud::add_prospects,
        campaigns::crud::list_prospects,
        campaigns::lifecycle::start_campaign,
        campaigns::lifecycle::pause_campaign,
        campaigns::lifecycle::resume_campaign,
        accounts::create_account,
        accounts::list_accounts,
        webhooks::create_subscription,
        webhooks::list_subscriptions,
        webhooks::list_deliveries,
    )
)]
struct ApiDoc;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(queues::health))
        .route(
            "/campaigns",
            get(campaigns::crud::list_campaigns).post(campaigns::crud::create_campaign),
        )
        .route("/campaigns/{id}", get(campaigns::crud::get_campaign))
        .route(
            "/campaigns/{id}/prospects",
            get(campaigns::crud::list_prospects).post(campaigns::crud::add_prospects),
        )
        .route(
            "/campaigns/{id}/start",
            post(campaigns::lifecycle::start_campaign),
        )
        .route(
            "/campaigns/{id}/pause",
            post(campaigns::lifecycle::pause_campaign),
        )
        .route(
            "/campaigns/{id}/resume",
            post(campaigns::lifecycle::resume_campaign),
        )
        .route(
            "/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/webhooks",
            get(webhooks::list_subscriptions).post(webhooks::create_subscription),
        )
        .route("/webhooks/{id}/deliveries", get(webhooks::list_deliveries))
        .route("/queues/{name}/stats", get(queues::queue_stats))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
