use std::sync::Arc;

use tracing::info;

use cadence_core::Config;
use cadence_orchestrator::Orchestrator;
use cadence_queue::{MemoryQueue, RetryPolicy, REPLY_CHECK_QUEUE, SEND_QUEUE};
use cadence_server::{background, router, AppState};
use cadence_store::MemoryStore;
use cadence_webhook::{HttpSender, WebhookDispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cadence_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    queue.register(SEND_QUEUE, RetryPolicy::send_queue()).await;
    queue
        .register(REPLY_CHECK_QUEUE, RetryPolicy::reply_check())
        .await;

    let webhooks = Arc::new(WebhookDispatcher::new(
        Arc::new(HttpSender::new()),
        store.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        queue.clone(),
        webhooks,
    ));

    let state = Arc::new(AppState {
        store,
        queue,
        orchestrator,
        config: config.clone(),
    });

    background::spawn_background_tasks(&state);

    let app = router::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        sweep_interval_secs = config.sweep.interval_secs,
        "Server listening on http://{}", addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}
