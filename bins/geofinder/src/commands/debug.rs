//! Diagnostics snapshot

use crate::output::{print_json, OutputFormat, Status};
use anyhow::Result;
use geofinder_locator::ProximityEngine;
use owo_colors::OwoColorize;

pub async fn run(engine: &ProximityEngine, format: OutputFormat) -> Result<()> {
    let diagnostics = engine.diagnostics().await;

    if format == OutputFormat::Json {
        return print_json(&diagnostics);
    }

    Status::header(&format!("Diagnostics ({})", diagnostics.backend));
    if diagnostics.store_available {
        Status::success("Store reachable");
    } else {
        Status::warning("Store unreachable");
    }

    for row in &diagnostics.categories {
        let primary = match (row.primary_count, &row.error) {
            (Some(count), _) => count.to_string(),
            (None, Some(error)) => format!("error: {}", error).red().to_string(),
            (None, None) => "-".dimmed().to_string(),
        };
        println!(
            "  {:<40} primary {:<8} memory {}",
            row.category, primary, row.fallback_count
        );
        for sample in &row.samples {
            println!("      {}", sample.member.dimmed());
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&diagnostics.metrics)?);
    Ok(())
}
