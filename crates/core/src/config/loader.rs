//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::env;
use std::path::Path;

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: ConfigSchema::default(),
            path: None,
        }
    }
}

impl Config {
    /// Load configuration from a file path (or the first standard location
    /// found), apply environment overrides, then validate.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(String::from).or_else(find_config_file);

        let schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };

        let mut config = Self {
            schema,
            path: config_path,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override file values with environment variables
    ///
    /// - `REDIS_URL`: store connection URL
    /// - `GEOFINDER_CONNECT_TIMEOUT_MS`: connect timeout
    /// - `GEOFINDER_DEFAULT_RADIUS_KM`: default search radius
    /// - `GEOFINDER_LOG`: default log filter
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("REDIS_URL") {
            self.schema.store.url = url;
        }
        if let Some(ms) = env::var("GEOFINDER_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.schema.store.connect_timeout_ms = ms;
        }
        if let Some(km) = env::var("GEOFINDER_DEFAULT_RADIUS_KM")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.schema.search.default_radius_km = km;
        }
        if let Ok(level) = env::var("GEOFINDER_LOG") {
            self.schema.logging.level = level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let store = &self.schema.store;
        if store.url.is_empty() {
            return Err(Error::config_invalid("store.url cannot be empty"));
        }
        if !store.url.starts_with("redis://") && !store.url.starts_with("rediss://") {
            return Err(Error::config_invalid(
                "store.url must start with redis:// or rediss://",
            ));
        }
        if store.connect_timeout_ms == 0 {
            return Err(Error::config_invalid("store.connect_timeout_ms cannot be zero"));
        }

        let radius = self.schema.search.default_radius_km;
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::config_invalid(format!(
                "search.default_radius_km must be a non-negative number, got {radius}"
            )));
        }
        if self.schema.search.key_prefix.is_empty() {
            return Err(Error::config_invalid("search.key_prefix cannot be empty"));
        }

        Ok(())
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<String> {
    let candidates = ["geofinder.toml", ".geofinder.toml", ".config/geofinder.toml"];

    candidates
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(String::from)
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &str) -> Result<ConfigSchema> {
    if !Path::new(path).exists() {
        return Err(Error::config_not_found(path));
    }

    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {path}"))?;

    toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {path}"))
}
