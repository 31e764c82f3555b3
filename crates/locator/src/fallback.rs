//! In-process fallback store
//!
//! Answers the same radius queries as the geo store by scanning the
//! built-in seed rows and the places written while the store was down.

use crate::error::{LocatorError, Result};
use crate::model::Place;
use crate::seed;
use chrono::{DateTime, Utc};
use geofinder_geo::{within_radius, Coordinate};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Per-category place lists plus the fixed seed rows
#[derive(Debug)]
pub struct FallbackStore {
    builtin: HashMap<String, Vec<Place>>,
    lists: RwLock<HashMap<String, Vec<Place>>>,
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackStore {
    pub fn new() -> Self {
        Self::with_builtin_time(Utc::now())
    }

    fn with_builtin_time(created_at: DateTime<Utc>) -> Self {
        let builtin = seed::categories()
            .into_iter()
            .map(|category| (category.to_string(), seed::places_for(category, created_at)))
            .collect();
        Self {
            builtin,
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Append to a category list, creating it if needed
    pub fn add(&self, place: Place) {
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(place.category.clone())
            .or_default()
            .push(place);
    }

    /// Places within `radius_km` of `center`, inclusive, with their distance.
    ///
    /// Built-in seed rows come first, then list entries in insertion order.
    /// List entries sharing an id with a built-in row of the same category
    /// are seeded copies and are skipped.
    pub fn radius_search(
        &self,
        category: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<(Place, f64)>> {
        let builtin = self.builtin.get(category).map(Vec::as_slice).unwrap_or(&[]);
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        let added = lists.get(category).map(Vec::as_slice).unwrap_or(&[]);

        let mut scanned: Vec<&Place> = builtin.iter().collect();
        scanned.extend(
            added
                .iter()
                .filter(|p| !builtin.iter().any(|b| b.id == p.id)),
        );

        let hits = within_radius(&center, &scanned, radius_km)
            .map_err(|e| LocatorError::InvalidInput(vec![e.to_string()]))?;
        Ok(hits
            .into_iter()
            .map(|(place, distance)| ((*place).clone(), distance))
            .collect())
    }

    /// Replace every seeded category's list with a fresh copy of its seed
    /// rows. Returns the row count per category.
    pub fn replace_with_seed(&self, created_at: DateTime<Utc>) -> BTreeMap<String, usize> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        seed::categories()
            .into_iter()
            .map(|category| {
                let places = seed::places_for(category, created_at);
                let count = places.len();
                lists.insert(category.to_string(), places);
                (category.to_string(), count)
            })
            .collect()
    }

    /// Length of each in-memory list
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(category, places)| (category.clone(), places.len()))
            .collect()
    }

    /// Length of one in-memory list
    pub fn list_len(&self, category: &str) -> usize {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Coordinate = Coordinate {
        latitude: -32.4877,
        longitude: -58.2342,
    };

    fn added(id: i64, category: &str, lat: f64, lng: f64) -> Place {
        Place {
            id,
            name: format!("place {id}"),
            category: category.to_string(),
            coordinate: Coordinate::new(lat, lng),
            created_at: Utc::now(),
        }
    }

    fn names(hits: &[(Place, f64)]) -> Vec<&str> {
        hits.iter().map(|(p, _)| p.name.as_str()).collect()
    }

    #[test]
    fn test_seed_rows_filtered_by_radius() {
        let store = FallbackStore::new();
        // Universidad Autónoma is ~0.96 km away, Universidad Nacional ~2.7 km
        let hits = store.radius_search("Universidades", CENTER, 1.0).unwrap();
        assert_eq!(names(&hits), vec!["Universidad Autónoma de Entre Ríos"]);

        let hits = store.radius_search("Universidades", CENTER, 3.0).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_seed_first_then_added() {
        let store = FallbackStore::new();
        store.add(added(100, "Farmacias", -32.4878, -58.2343));
        let hits = store.radius_search("Farmacias", CENTER, 1.0).unwrap();
        assert_eq!(
            names(&hits),
            vec![
                "Farmacia Central",
                "Farmacia del Pueblo",
                "Farmacia San Martín",
                "place 100"
            ]
        );
    }

    #[test]
    fn test_unknown_category() {
        let store = FallbackStore::new();
        assert!(store.radius_search("Museos", CENTER, 50.0).unwrap().is_empty());

        store.add(added(101, "Museos", -32.4877, -58.2342));
        let hits = store.radius_search("Museos", CENTER, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_categories_never_mix() {
        let store = FallbackStore::new();
        store.add(added(102, "Museos", -32.4877, -58.2342));
        let hits = store.radius_search("Farmacias", CENTER, 5.0).unwrap();
        assert!(hits.iter().all(|(p, _)| p.category == "Farmacias"));
    }

    #[test]
    fn test_replace_with_seed_is_not_cumulative() {
        let store = FallbackStore::new();
        store.add(added(103, "Farmacias", -32.4877, -58.2342));

        let first = store.replace_with_seed(Utc::now());
        let second = store.replace_with_seed(Utc::now());
        assert_eq!(first, second);
        assert_eq!(store.list_len("Farmacias"), 3);
        assert_eq!(store.counts().values().sum::<usize>(), 14);

        // Seeded copies do not double the rows returned
        let hits = store.radius_search("Farmacias", CENTER, 5.0).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_negative_radius_rejected() {
        let store = FallbackStore::new();
        assert!(matches!(
            store.radius_search("Farmacias", CENTER, -1.0),
            Err(LocatorError::InvalidInput(_))
        ));
    }
}
