//! HTTP command surface and background wiring for the campaign
//! scheduler.

pub mod accounts;
pub mod background;
pub mod campaigns;
pub mod queues;
pub mod router;
pub mod state;
pub mod webhooks;


pub use state::AppState;
