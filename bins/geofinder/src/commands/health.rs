//! Health check command

use crate::output::{print_json, OutputFormat, Status};
use anyhow::{bail, Result};
use geofinder_core::health::HealthStatus;
use geofinder_locator::ProximityEngine;
use owo_colors::OwoColorize;

/// Print store and fallback health. With `strict`, anything short of
/// healthy is an error.
pub async fn run(engine: &ProximityEngine, strict: bool, format: OutputFormat) -> Result<()> {
    let report = engine.health().await;

    if format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        Status::header("Health");
        for check in &report.checks {
            let status = match check.status {
                HealthStatus::Healthy => "✓ healthy".green().to_string(),
                HealthStatus::Degraded => "⚠ degraded".yellow().to_string(),
            };
            println!(
                "  {:<10} {} {}",
                check.name,
                status,
                format!("({}ms)", check.duration_ms).dimmed()
            );
            if let Some(message) = &check.message {
                println!("             {}", message.dimmed());
            }
            for (key, value) in &check.details {
                println!("             {}: {}", key, value);
            }
        }
    }

    if strict && !report.is_healthy() {
        let failed: Vec<&str> = report.failed_checks().iter().map(|c| c.name.as_str()).collect();
        bail!("{} not healthy", failed.join(", "));
    }
    Ok(())
}
