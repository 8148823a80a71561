use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep ticks over active campaigns.
    pub interval_secs: u64,
    /// UTC hour at which `sent_today` counters reset.
    pub daily_reset_hour: u8,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("CADENCE_HOST", "0.0.0.0"),
                port: env_u16("CADENCE_PORT", 8080),
            },
            sweep: SweepConfig {
                interval_secs: env_u64("CADENCE_SWEEP_INTERVAL_SECS", 60),
                daily_reset_hour: env_u16("CADENCE_DAILY_RESET_HOUR", 0).min(23) as u8,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            sweep: SweepConfig {
                interval_secs: 60,
                daily_reset_hour: 0,
            },
        }
    }
}
