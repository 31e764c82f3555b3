//! Property: a freshly added place is inside any non-negative radius
//! around its own position, on either backing.

use geofinder_core::config::SearchConfig;
use geofinder_locator::store::MemoryGeoStore;
use geofinder_locator::{LocatorContext, ProximityEngine};
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn added_place_is_found_at_its_position(
        lat in -85.0f64..85.0,
        lng in -180.0f64..180.0,
        radius in 0.0f64..50.0,
        offline in any::<bool>(),
    ) {
        let store = Arc::new(MemoryGeoStore::new());
        store.set_offline(offline);
        let engine = ProximityEngine::new(LocatorContext::with_store(
            store,
            &SearchConfig::default(),
        ));

        let (created, results) = tokio_test::block_on(async {
            let created = engine.add_entity("Miradores", "Mirador", lat, lng).await.unwrap();
            let results = engine.find_nearby("Miradores", lat, lng, Some(radius)).await.unwrap();
            (created, results)
        });

        prop_assert_eq!(results.provenance, created.provenance);
        let row = results.places.iter().find(|p| p.id == created.place.id);
        prop_assert!(row.is_some());
        prop_assert_eq!(row.map(|p| p.distance_km), Some(0.0));
    }
}
