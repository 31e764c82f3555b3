//! Core utilities for geofinder
//!
//! This crate provides shared functionality used by the locator and the CLI:
//!
//! - **Error handling**: Coded errors with context and recovery suggestions
//! - **Configuration**: TOML-based configuration with environment overrides
//! - **Reconnect policy**: Pure backoff rules for the store connection
//! - **Validation**: Rule-collecting validators for places and queries
//! - **Health reports**: Aggregated check results
//!
//! # Example
//!
//! ```rust,no_run
//! use geofinder_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("store at {}", config.schema.store.url);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod health;
pub mod retry;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::health::{CheckResult, HealthReport, HealthStatus};
    pub use crate::retry::ReconnectPolicy;
    pub use crate::validation::{ValidationResult, Validator};
}
