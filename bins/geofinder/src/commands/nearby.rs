//! Radius query command

use crate::output::{format_count, print_json, OutputFormat, PlaceRow, Status};
use anyhow::Result;
use geofinder_locator::ProximityEngine;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
struct NearbyOutput<'a> {
    category: &'a str,
    provenance: &'static str,
    count: usize,
    places: Vec<PlaceRow>,
}

/// Print places of `category` around `(lat, lng)`
pub async fn run(
    engine: &ProximityEngine,
    category: &str,
    lat: f64,
    lng: f64,
    radius_km: Option<f64>,
    sort: bool,
    format: OutputFormat,
) -> Result<()> {
    let results = engine.find_nearby(category, lat, lng, radius_km).await?;

    let mut rows: Vec<PlaceRow> = results.places.iter().map(PlaceRow::from).collect();
    if sort {
        rows.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    }

    if format == OutputFormat::Json {
        return print_json(&NearbyOutput {
            category,
            provenance: results.provenance.as_str(),
            count: rows.len(),
            places: rows,
        });
    }

    Status::header(&format!("{} near {:.4}, {:.4}", category, lat, lng));
    if rows.is_empty() {
        Status::info("Nothing found in range");
    }
    for row in &rows {
        println!(
            "  {:>7}  {}  {}",
            format!("{:.2} km", row.distance_km).cyan(),
            row.name.bold(),
            format!("({:.4}, {:.4})", row.lat, row.lng).dimmed()
        );
    }
    println!();
    println!(
        "  {} from {}",
        format_count(rows.len(), "place", "places"),
        results.provenance.to_string().yellow()
    );
    Ok(())
}
