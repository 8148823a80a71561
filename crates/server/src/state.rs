use std::sync::Arc;

use cadence_core::Config;
use cadence_orchestrator::Orchestrator;
use cadence_queue::DeliveryQueue;
use cadence_store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn DeliveryQueue>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: Config,
}
