//! Configuration schema definitions

use crate::retry::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Geospatial store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Timeout for a single connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Reconnect attempts before the connection is declared dead
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay added per reconnect attempt
    #[serde(default = "default_reconnect_step_ms")]
    pub reconnect_step_ms: u64,

    /// Upper bound on a single reconnect delay
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// How long a dead connection stays dead before the probe may retry
    #[serde(default = "default_revive_after_secs")]
    pub revive_after_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_step_ms: default_reconnect_step_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            revive_after_secs: default_revive_after_secs(),
        }
    }
}

impl StoreConfig {
    /// Reconnect policy described by this section
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            step: Duration::from_millis(self.reconnect_step_ms),
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// Cool-down applied to a dead connection
    pub fn revive_after(&self) -> Duration {
        Duration::from_secs(self.revive_after_secs)
    }
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_step_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    3000
}

fn default_revive_after_secs() -> u64 {
    30
}

/// Radius search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius used when a caller does not give one
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,

    /// Prefix of per-category collection keys (`<prefix>:<category>`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_radius_km() -> f64 {
    5.0
}

fn default_key_prefix() -> String {
    "locations".to_string()
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
