pub mod account;
pub mod campaign;
pub mod config;
pub mod prospect;
pub mod schedule;

pub use account::*;
pub use campaign::*;
pub use config::Config;
pub use prospect::*;
pub use schedule::*;
