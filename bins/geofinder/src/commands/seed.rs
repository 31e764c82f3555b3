//! Reload the seed dataset

use crate::output::{persistence_note, print_json, OutputFormat, Status};
use anyhow::Result;
use geofinder_locator::ProximityEngine;

pub async fn run(engine: &ProximityEngine, format: OutputFormat) -> Result<()> {
    let report = engine.seed().await;
    if let Some(note) = persistence_note(report.provenance) {
        Status::warning(note);
    }

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    for (category, count) in &report.per_category {
        println!("  {:<40} {}", category, count);
    }
    Status::success(&format!(
        "Seeded {} places into {}",
        report.inserted, report.provenance
    ));
    Ok(())
}
