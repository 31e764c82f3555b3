//! Built-in seed dataset: five categories around Concepción del Uruguay

use crate::model::Place;
use chrono::{DateTime, Utc};
use geofinder_geo::Coordinate;

/// A fixed seed row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedPlace {
    pub id: i64,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl SeedPlace {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn to_place(&self, category: &str, created_at: DateTime<Utc>) -> Place {
        Place {
            id: self.id,
            name: self.name.to_string(),
            category: category.to_string(),
            coordinate: self.coordinate(),
            created_at,
        }
    }
}

const fn row(id: i64, name: &'static str, latitude: f64, longitude: f64) -> SeedPlace {
    SeedPlace {
        id,
        name,
        latitude,
        longitude,
    }
}

/// Categories and their rows, in display order
pub const SEED_DATASET: &[(&str, &[SeedPlace])] = &[
    (
        "Cervecerías artesanales",
        &[
            row(1, "7 Colinas de Río", -32.480022, -58.235237),
            row(2, "Baws", -32.485889, -58.232784),
            row(3, "Drakkar", -32.480520, -58.233980),
        ],
    ),
    (
        "Universidades",
        &[
            row(4, "Universidad Autónoma de Entre Ríos", -32.479124, -58.233190),
            row(5, "Universidad Nacional de Entre Ríos", -32.480666, -58.262164),
        ],
    ),
    (
        "Farmacias",
        &[
            row(6, "Farmacia Central", -32.4889, -58.2356),
            row(7, "Farmacia del Pueblo", -32.4834, -58.2378),
            row(8, "Farmacia San Martín", -32.4901, -58.2312),
        ],
    ),
    (
        "Centros de atención de emergencias",
        &[
            row(9, "Hospital Urquiza", -32.480918, -58.260957),
            row(10, "Centro de Salud Municipal", -32.482405, -58.225673),
            row(11, "Clínica Uruguay", -32.483581, -58.230212),
        ],
    ),
    (
        "Supermercados",
        &[
            row(12, "Supermercado Gran Rex", -32.489025, -58.230427),
            row(13, "Supermercado Supremo", -32.486240, -58.232716),
            row(14, "Supermercado Dia", -32.482717, -58.227362),
        ],
    ),
];

/// Names of the seeded categories
pub fn categories() -> Vec<&'static str> {
    SEED_DATASET.iter().map(|(name, _)| *name).collect()
}

/// Seed rows for a category; empty for categories without seed data
pub fn rows_for(category: &str) -> &'static [SeedPlace] {
    SEED_DATASET
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, rows)| *rows)
        .unwrap_or(&[])
}

/// Seed rows of a category as places stamped with `created_at`
pub fn places_for(category: &str, created_at: DateTime<Utc>) -> Vec<Place> {
    rows_for(category)
        .iter()
        .map(|row| row.to_place(category, created_at))
        .collect()
}

/// Total number of seed rows
pub fn total() -> usize {
    SEED_DATASET.iter().map(|(_, rows)| rows.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_dataset_shape() {
        assert_eq!(categories().len(), 5);
        assert_eq!(total(), 14);
        assert_eq!(rows_for("Farmacias").len(), 3);
        assert_eq!(rows_for("Universidades").len(), 2);
    }

    #[test]
    fn test_unknown_category_is_empty() {
        assert!(rows_for("Museos").is_empty());
        assert!(places_for("Museos", Utc::now()).is_empty());
    }

    #[test]
    fn test_ids_unique_and_coordinates_valid() {
        let mut ids = HashSet::new();
        for (_, rows) in SEED_DATASET {
            for row in rows.iter() {
                assert!(ids.insert(row.id));
                assert!(row.coordinate().is_valid());
                assert!(!row.coordinate().is_null_island());
            }
        }
    }

    #[test]
    fn test_places_carry_category() {
        let now = Utc::now();
        let places = places_for("Supermercados", now);
        assert_eq!(places.len(), 3);
        assert!(places.iter().all(|p| p.category == "Supermercados" && p.created_at == now));
        assert_eq!(places[0].name, "Supermercado Gran Rex");
    }
}
