//! geofinder - find tourist points of interest near a position
//!
//! Queries a Redis geo index and falls back to built-in data when Redis is
//! out of reach.

use clap::{Parser, Subcommand};
use geofinder_core::config::Config;
use geofinder_core::error::{exit_codes, Error as CoreError, ResultExt};
use geofinder_locator::{LocatorContext, LocatorError, ProximityEngine};
use geofinder_telemetry::TelemetryConfig;
use output::{OutputFormat, Status};
use std::process::ExitCode;

mod commands;
mod output;

/// Tourist location finder
#[derive(Debug, Parser)]
#[command(name = "geofinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Store URL, overrides config and REDIS_URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List places of a category around a position
    Nearby {
        /// Category name, e.g. "Farmacias"
        category: String,

        /// Latitude of the center
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the center
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Radius in kilometers (defaults to search.default_radius_km)
        #[arg(short, long)]
        radius: Option<f64>,

        /// Sort nearest first
        #[arg(long)]
        sort: bool,
    },

    /// Add a place to a category
    Add {
        /// Category name
        category: String,

        /// Place name
        name: String,

        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },

    /// Replace every seeded category with the built-in dataset
    Seed,

    /// Check store and fallback health
    Health {
        /// Fail unless every check is healthy
        #[arg(long)]
        strict: bool,
    },

    /// Show per-category counts in both stores and engine counters
    Debug,

    /// List categories that ship with seed data
    Categories,

    /// Write, find and delete a probe point in the store
    SelfTest,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return config_failure(&e, cli.format),
    };
    if let Some(url) = &cli.url {
        config.schema.store.url = url.clone();
        if let Err(e) = config.validate().context("After applying --url") {
            return config_failure(&e, cli.format);
        }
    }

    let log_level = match cli.verbose {
        0 => config.schema.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    if let Err(e) = geofinder_telemetry::init_with_config(TelemetryConfig {
        log_level,
        json: config.schema.logging.json,
        show_target: cli.verbose > 0,
    }) {
        Status::warning(&format!("Logging disabled: {}", e));
    }
    tracing::debug!(path = ?config.path, url = %config.schema.store.url, "Configuration loaded");

    let context = match LocatorContext::open(&config.schema) {
        Ok(context) => context,
        Err(e) => {
            Status::error(&e.to_string());
            return exit(exit_codes::CONFIG_ERROR);
        }
    };
    let engine = ProximityEngine::new(context);

    let result = run(&engine, cli.command, cli.format).await;
    engine.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Status::error(&format!("{:#}", e));
            exit(exit_code_for(&e))
        }
    }
}

async fn run(engine: &ProximityEngine, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Nearby {
            category,
            lat,
            lng,
            radius,
            sort,
        } => commands::nearby::run(engine, &category, lat, lng, radius, sort, format).await,
        Commands::Add {
            category,
            name,
            lat,
            lng,
        } => commands::add::run(engine, &category, &name, lat, lng, format).await,
        Commands::Seed => commands::seed::run(engine, format).await,
        Commands::Health { strict } => commands::health::run(engine, strict, format).await,
        Commands::Debug => commands::debug::run(engine, format).await,
        Commands::Categories => commands::categories::run(engine, format),
        Commands::SelfTest => commands::self_test::run(engine, format).await,
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LocatorError>() {
        Some(LocatorError::InvalidInput(_)) => exit_codes::VALIDATION_ERROR,
        Some(e) if e.is_store_failure() => exit_codes::STORE_ERROR,
        _ => exit_codes::FAILURE,
    }
}

/// Report a configuration error, as an `ErrorReport` in JSON mode
fn config_failure(err: &CoreError, format: OutputFormat) -> ExitCode {
    match format {
        OutputFormat::Json => {
            if let Err(e) = output::print_json(&err.to_report()) {
                Status::error(&e.to_string());
            }
        }
        OutputFormat::Text => Status::error(&err.to_string()),
    }
    exit(exit_codes::CONFIG_ERROR)
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
