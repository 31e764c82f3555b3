//! Radius filtering over located items.
//!
//! Results keep the input order. Nothing here sorts by distance; callers that
//! want nearest-first ordering sort downstream.

use crate::{haversine_distance, Coordinate, GeoError, Result};

/// Anything that sits at a single point on the map.
pub trait Located {
    /// Position of the item.
    fn coordinate(&self) -> Coordinate;
}

impl Located for Coordinate {
    fn coordinate(&self) -> Coordinate {
        *self
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn coordinate(&self) -> Coordinate {
        (**self).coordinate()
    }
}

/// Distance in kilometers from `center` to every item, in input order.
///
/// Uses rayon when the `parallel` feature is enabled; ordering is the same
/// either way.
pub fn distances_from<T: Located + Sync>(center: &Coordinate, items: &[T]) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items
            .par_iter()
            .map(|item| haversine_distance(center, &item.coordinate()))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items
            .iter()
            .map(|item| haversine_distance(center, &item.coordinate()))
            .collect()
    }
}

/// Items within `radius_km` of `center` (inclusive), paired with their distance.
///
/// # Errors
/// Returns [`GeoError::InvalidRadius`] for a negative or non-finite radius.
///
/// # Example
/// ```
/// use geofinder_geo::{within_radius, Coordinate};
///
/// let center = Coordinate::new(-32.4877, -58.2342);
/// let points = [
///     Coordinate::new(-32.4889, -58.2356),   // ~0.19 km
///     Coordinate::new(-32.480666, -58.262164), // ~2.7 km
/// ];
///
/// let hits = within_radius(&center, &points, 1.0).unwrap();
/// assert_eq!(hits.len(), 1);
/// ```
pub fn within_radius<'a, T: Located + Sync>(
    center: &Coordinate,
    items: &'a [T],
    radius_km: f64,
) -> Result<Vec<(&'a T, f64)>> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(GeoError::InvalidRadius(radius_km));
    }

    let distances = distances_from(center, items);
    Ok(items
        .iter()
        .zip(distances)
        .filter(|(_, distance)| *distance <= radius_km)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Coordinate> {
        vec![
            // Farmacia Central
            Coordinate::new(-32.4889, -58.2356),
            // Universidad Nacional de Entre Ríos
            Coordinate::new(-32.480666, -58.262164),
            // Farmacia San Martín
            Coordinate::new(-32.4901, -58.2312),
        ]
    }

    #[test]
    fn test_distances_keep_input_order() {
        let center = Coordinate::new(-32.4877, -58.2342);
        let items = sample();
        let distances = distances_from(&center, &items);

        assert_eq!(distances.len(), 3);
        assert!(distances[1] > distances[0]);
        assert!(distances[1] > distances[2]);
    }

    #[test]
    fn test_radius_filter_inclusive_and_ordered() {
        let center = Coordinate::new(-32.4877, -58.2342);
        let items = sample();
        let hits = within_radius(&center, &items, 1.0).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(*hits[0].0, items[0]);
        assert_eq!(*hits[1].0, items[2]);
        assert!(hits.iter().all(|(_, d)| *d <= 1.0));
    }

    #[test]
    fn test_zero_radius_keeps_exact_match() {
        let center = Coordinate::new(-32.4889, -58.2356);
        let items = sample();
        let hits = within_radius(&center, &items, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_invalid_radius() {
        let center = Coordinate::new(0.0, 0.0);
        assert!(within_radius(&center, &sample(), -1.0).is_err());
        assert!(within_radius(&center, &sample(), f64::NAN).is_err());
    }
}
