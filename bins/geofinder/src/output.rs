//! Terminal output helpers

use clap::ValueEnum;
use geofinder_geo::round_to;
use geofinder_locator::{NearbyPlace, Provenance};
use owo_colors::OwoColorize;
use serde::Serialize;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Status message helpers
pub struct Status;

impl Status {
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A result row rounded for display: coordinates to 4 decimals, distance
/// to 2
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    pub created_at: String,
}

impl From<&NearbyPlace> for PlaceRow {
    fn from(place: &NearbyPlace) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
            category: place.category.clone(),
            lat: round_to(place.lat, 4),
            lng: round_to(place.lng, 4),
            distance_km: round_to(place.distance_km, 2),
            created_at: place.created_at.to_rfc3339(),
        }
    }
}

/// Warning for writes that only reached this process's fallback store
pub fn persistence_note(provenance: Provenance) -> Option<&'static str> {
    match provenance {
        Provenance::Primary => None,
        Provenance::Fallback => Some(
            "Store unavailable: written to the in-memory fallback, which is discarded when this command exits",
        ),
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_place_row_rounding() {
        let place = NearbyPlace {
            id: 8,
            name: "Farmacia San Martín".to_string(),
            category: "Farmacias".to_string(),
            lat: -32.490_123_4,
            lng: -58.231_267_8,
            distance_km: 0.388_462,
            created_at: Utc::now(),
        };
        let row = PlaceRow::from(&place);
        assert_eq!(row.lat, -32.4901);
        assert_eq!(row.lng, -58.2313);
        assert_eq!(row.distance_km, 0.39);
    }

    #[test]
    fn test_persistence_note_only_for_fallback() {
        assert_eq!(persistence_note(Provenance::Primary), None);
        let note = persistence_note(Provenance::Fallback).unwrap();
        assert!(note.contains("discarded when this command exits"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "place", "places"), "1 place");
        assert_eq!(format_count(3, "place", "places"), "3 places");
    }
}
