//! Add a place

use crate::output::{persistence_note, print_json, OutputFormat, Status};
use anyhow::Result;
use geofinder_locator::ProximityEngine;

pub async fn run(
    engine: &ProximityEngine,
    category: &str,
    name: &str,
    lat: f64,
    lng: f64,
    format: OutputFormat,
) -> Result<()> {
    let created = engine.add_entity(category, name, lat, lng).await?;
    if let Some(note) = persistence_note(created.provenance) {
        Status::warning(note);
    }

    if format == OutputFormat::Json {
        return print_json(&created);
    }

    Status::success(&format!(
        "Added \"{}\" to {} (id {}, stored in {})",
        created.place.name, created.place.category, created.place.id, created.provenance
    ));
    Ok(())
}
