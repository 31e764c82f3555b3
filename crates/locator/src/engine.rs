//! Proximity Query Engine
//!
//! Every call probes the store first. A healthy store serves the call; an
//! unreachable store, or any store error during the call, sends the whole
//! call to the fallback store. Results from the two are never merged.

use crate::adapter::{DistanceUnit, GeoMatch, SearchOptions, SelfTestReport};
use crate::context::LocatorContext;
use crate::error::Result;
use crate::model::{CreatedPlace, NearbyPlace, NearbyResults, Place, PlacePayload, Provenance, SeedReport};
use crate::seed;
use chrono::{DateTime, Utc};
use geofinder_core::health::{CheckResult, HealthReport};
use geofinder_core::validation::{validate_nearby_query, validate_new_place};
use geofinder_geo::Coordinate;
use geofinder_telemetry::Timer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Radius covering the whole planet, used to count a collection
const WHOLE_EARTH_KM: f64 = 20_000.0;

/// Sample rows shown per category in diagnostics
const DIAGNOSTIC_SAMPLES: usize = 2;

/// Per-category view of both backings
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDiagnostics {
    pub category: String,
    /// Members in the store, `None` when it could not be read
    pub primary_count: Option<usize>,
    pub samples: Vec<GeoMatch>,
    pub error: Option<String>,
    /// Entries in the in-memory list
    pub fallback_count: usize,
}

/// Snapshot for troubleshooting
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub backend: String,
    pub store_available: bool,
    pub categories: Vec<CategoryDiagnostics>,
    pub metrics: serde_json::Value,
}

/// Orchestrates the geo store and the fallback store
pub struct ProximityEngine {
    ctx: LocatorContext,
}

impl ProximityEngine {
    pub fn new(context: LocatorContext) -> Self {
        Self { ctx: context }
    }

    pub fn context(&self) -> &LocatorContext {
        &self.ctx
    }

    /// Close the underlying context
    pub async fn close(&self) {
        self.ctx.close().await;
    }

    async fn store_available(&self) -> bool {
        self.ctx.ensure_open().is_ok() && self.ctx.adapter().is_available().await
    }

    /// Places of `category` within `radius_km` of `(lat, lng)`.
    ///
    /// `radius_km` defaults to the configured radius. Only invalid input is
    /// an error; store trouble is answered from the fallback store.
    #[instrument(skip(self), fields(provenance = tracing::field::Empty))]
    pub async fn find_nearby(
        &self,
        category: &str,
        lat: f64,
        lng: f64,
        radius_km: Option<f64>,
    ) -> Result<NearbyResults> {
        let radius_km = radius_km.unwrap_or_else(|| self.ctx.default_radius_km());
        let check = validate_nearby_query(lat, lng, radius_km);
        if !check.is_valid() {
            return Err(check.into());
        }

        let center = Coordinate::new(lat, lng);
        let timer = Timer::start("find_nearby.ms", Arc::clone(self.ctx.metrics()));

        let primary = if self.store_available().await {
            match self.search_primary(category, center, radius_km).await {
                Ok(places) => Some(places),
                Err(e) => {
                    warn!(category, error = %e, "Primary search failed, using fallback");
                    None
                }
            }
        } else {
            warn!(category, "Store unavailable, using fallback");
            None
        };

        let results = match primary {
            Some(places) => NearbyResults {
                provenance: Provenance::Primary,
                places,
            },
            None => NearbyResults {
                provenance: Provenance::Fallback,
                places: self.search_fallback(category, center, radius_km)?,
            },
        };

        timer.stop();
        tracing::Span::current().record("provenance", results.provenance.as_str());
        self.ctx
            .metrics()
            .increment(&format!("queries.{}", results.provenance));
        debug!(category, count = results.len(), "Nearby query served");
        Ok(results)
    }

    async fn search_primary(
        &self,
        category: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyPlace>> {
        let matches = self
            .ctx
            .adapter()
            .radius_search(
                category,
                center,
                radius_km,
                DistanceUnit::Kilometers,
                SearchOptions::full(),
            )
            .await?;

        let mut places = Vec::with_capacity(matches.len());
        for m in matches {
            let payload = match PlacePayload::parse(&m.member) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(category, member = %m.member, error = %e, "Dropping unreadable member");
                    self.ctx.metrics().increment("payloads.dropped");
                    continue;
                }
            };

            let coordinate = m.coordinates.unwrap_or(Coordinate::NULL_ISLAND);
            if coordinate.is_null_island() {
                warn!(category, id = payload.id, name = %payload.name, "Place resolved to (0,0)");
            }

            places.push(NearbyPlace {
                id: payload.id,
                name: payload.name,
                category: category.to_string(),
                lat: coordinate.latitude,
                lng: coordinate.longitude,
                distance_km: m.distance.unwrap_or(0.0),
                created_at: payload.created_at,
            });
        }
        Ok(places)
    }

    fn search_fallback(
        &self,
        category: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyPlace>> {
        Ok(self
            .ctx
            .fallback()
            .radius_search(category, center, radius_km)?
            .into_iter()
            .map(|(place, distance)| place.into_nearby(distance))
            .collect())
    }

    /// Validate and store a new place.
    ///
    /// Every broken rule is reported in one `InvalidInput`. The name is
    /// trimmed; the id is time-derived.
    #[instrument(skip(self))]
    pub async fn add_entity(
        &self,
        category: &str,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<CreatedPlace> {
        let check = validate_new_place(category, name, latitude, longitude);
        if !check.is_valid() {
            return Err(check.into());
        }

        let place = Place {
            id: self.ctx.ids().next_id(),
            name: name.trim().to_string(),
            category: category.to_string(),
            coordinate: Coordinate::new(latitude, longitude),
            created_at: Utc::now(),
        };

        if self.store_available().await {
            match self.ctx.adapter().add_point(category, &place).await {
                Ok(()) => {
                    self.verify_insert(&place).await;
                    self.ctx.metrics().increment("writes.primary");
                    info!(category, id = place.id, "Place stored in primary");
                    return Ok(CreatedPlace {
                        provenance: Provenance::Primary,
                        place,
                    });
                }
                Err(e) => warn!(category, error = %e, "Primary write failed, using fallback"),
            }
        } else {
            warn!(category, "Store unavailable, writing to fallback");
        }

        self.ctx.fallback().add(place.clone());
        self.ctx.metrics().increment("writes.fallback");
        info!(category, id = place.id, "Place stored in fallback");
        Ok(CreatedPlace {
            provenance: Provenance::Fallback,
            place,
        })
    }

    async fn verify_insert(&self, place: &Place) {
        match self
            .ctx
            .adapter()
            .verify_insert(&place.category, place.coordinate)
            .await
        {
            Ok(found) => debug!(id = place.id, found, "Post-insert check"),
            Err(e) => debug!(id = place.id, error = %e, "Post-insert check failed"),
        }
    }

    /// Replace every seeded category with the built-in rows.
    ///
    /// On the store each collection is deleted and refilled. Without the
    /// store, or if any store step fails, the fallback lists are replaced.
    #[instrument(skip(self))]
    pub async fn seed(&self) -> SeedReport {
        let now = Utc::now();

        if self.store_available().await {
            match self.seed_primary(now).await {
                Ok(per_category) => return seed_report(Provenance::Primary, per_category),
                Err(e) => warn!(error = %e, "Seeding the store failed, seeding fallback"),
            }
        } else {
            warn!("Store unavailable, seeding fallback");
        }

        seed_report(Provenance::Fallback, self.ctx.fallback().replace_with_seed(now))
    }

    async fn seed_primary(&self, now: DateTime<Utc>) -> Result<BTreeMap<String, usize>> {
        let adapter = self.ctx.adapter();
        for category in seed::categories() {
            adapter.clear(category).await?;
        }

        let mut per_category = BTreeMap::new();
        for category in seed::categories() {
            for place in seed::places_for(category, now) {
                adapter.add_point(category, &place).await?;
                *per_category.entry(category.to_string()).or_insert(0) += 1;
            }
        }
        Ok(per_category)
    }

    /// Categories that ship with seed data
    pub fn categories(&self) -> Vec<&'static str> {
        seed::categories()
    }

    /// Store and fallback checks. A down store is `degraded` since the
    /// fallback keeps serving.
    pub async fn health(&self) -> HealthReport {
        let started = Instant::now();
        let adapter = self.ctx.adapter();

        let probe_started = Instant::now();
        let probe = match self.ctx.ensure_open() {
            Ok(()) => adapter.ping().await,
            Err(e) => Err(e),
        };
        let store = match probe {
            Ok(()) => {
                let check = CheckResult::healthy("store").with_detail("backend", adapter.backend());
                match adapter.server_version().await {
                    Ok(version) => check.with_detail("version", version),
                    Err(_) => check,
                }
            }
            Err(e) => CheckResult::degraded("store", format!("{e}; serving from fallback"))
                .with_detail("backend", adapter.backend()),
        }
        .with_duration(probe_started.elapsed());

        let memory_rows: usize = self.ctx.fallback().counts().values().sum();
        let fallback = CheckResult::healthy("fallback")
            .with_detail("seed_rows", seed::total().to_string())
            .with_detail("memory_rows", memory_rows.to_string());

        HealthReport::new(vec![store, fallback], started.elapsed())
    }

    /// Counts and samples per category from both backings, plus counters.
    /// Store errors are reported per category rather than raised.
    pub async fn diagnostics(&self) -> Diagnostics {
        let available = self.store_available().await;
        let fallback_counts = self.ctx.fallback().counts();

        let mut names: Vec<String> = seed::categories().into_iter().map(String::from).collect();
        for category in fallback_counts.keys() {
            if !names.contains(category) {
                names.push(category.clone());
            }
        }

        let mut categories = Vec::with_capacity(names.len());
        for category in names {
            let mut row = CategoryDiagnostics {
                fallback_count: fallback_counts.get(&category).copied().unwrap_or(0),
                category,
                primary_count: None,
                samples: Vec::new(),
                error: None,
            };
            if available {
                match self
                    .ctx
                    .adapter()
                    .radius_search(
                        &row.category,
                        Coordinate::NULL_ISLAND,
                        WHOLE_EARTH_KM,
                        DistanceUnit::Kilometers,
                        SearchOptions::full(),
                    )
                    .await
                {
                    Ok(matches) => {
                        row.primary_count = Some(matches.len());
                        row.samples = matches.into_iter().take(DIAGNOSTIC_SAMPLES).collect();
                    }
                    Err(e) => row.error = Some(e.to_string()),
                }
            }
            categories.push(row);
        }

        Diagnostics {
            backend: self.ctx.adapter().backend().to_string(),
            store_available: available,
            categories,
            metrics: self.ctx.metrics().export_json(),
        }
    }

    /// Round-trip a probe point through the store
    pub async fn self_test(&self) -> SelfTestReport {
        let adapter = self.ctx.adapter();
        let outcome = match self.ctx.ensure_open() {
            Ok(()) => adapter.self_test().await,
            Err(e) => Err(e),
        };
        outcome.unwrap_or_else(|e| SelfTestReport {
            passed: false,
            backend: adapter.backend().to_string(),
            matches: 0,
            detail: e.to_string(),
        })
    }
}

fn seed_report(provenance: Provenance, per_category: BTreeMap<String, usize>) -> SeedReport {
    let inserted = per_category.values().sum();
    info!(%provenance, inserted, "Seed complete");
    SeedReport {
        provenance,
        inserted,
        per_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocatorError;
    use crate::store::MemoryGeoStore;
    use geofinder_core::config::SearchConfig;
    use geofinder_core::health::HealthStatus;

    fn engine(store: &Arc<MemoryGeoStore>) -> ProximityEngine {
        ProximityEngine::new(LocatorContext::with_store(
            store.clone(),
            &SearchConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_default_radius_applies() {
        let store = Arc::new(MemoryGeoStore::offline());
        let engine = engine(&store);
        // Every seed university lies within 5 km of the plaza
        let results = engine
            .find_nearby("Universidades", -32.4877, -58.2342, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let store = Arc::new(MemoryGeoStore::new());
        let err = engine(&store)
            .find_nearby("Farmacias", f64::NAN, -58.2342, Some(-1.0))
            .await
            .unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert_eq!(store.ping_count(), 0);
    }

    #[tokio::test]
    async fn test_counters_follow_provenance() {
        let store = Arc::new(MemoryGeoStore::new());
        let engine = engine(&store);
        engine.find_nearby("Farmacias", 0.0, 0.0, Some(1.0)).await.unwrap();
        store.set_offline(true);
        engine.find_nearby("Farmacias", 0.0, 0.0, Some(1.0)).await.unwrap();
        engine.add_entity("Farmacias", "Nueva", 1.0, 1.0).await.unwrap();

        let metrics = engine.context().metrics();
        assert_eq!(metrics.counter("queries.primary"), 1);
        assert_eq!(metrics.counter("queries.fallback"), 1);
        assert_eq!(metrics.counter("writes.fallback"), 1);
    }

    #[tokio::test]
    async fn test_missing_position_reported_at_origin() {
        let store = Arc::new(MemoryGeoStore::new());
        let engine = engine(&store);
        let created = engine
            .add_entity("Farmacias", "Sin posición", -32.4877, -58.2342)
            .await
            .unwrap();
        store.fail_position_of(created.place.payload().to_member().unwrap());

        let results = engine
            .find_nearby("Farmacias", -32.4877, -58.2342, Some(1.0))
            .await
            .unwrap();
        assert_eq!(results.provenance, Provenance::Primary);
        assert_eq!(results.places[0].coordinate(), Coordinate::NULL_ISLAND);
        assert_eq!(results.places[0].distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_health_degrades_without_store() {
        let store = Arc::new(MemoryGeoStore::new());
        let engine = engine(&store);
        let report = engine.health().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.checks[0].details.contains_key("version"));

        store.set_offline(true);
        let report = engine.health().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.failed_checks()[0].name, "store");
    }

    #[tokio::test]
    async fn test_diagnostics_reports_both_backings() {
        let store = Arc::new(MemoryGeoStore::new());
        let engine = engine(&store);
        engine.seed().await;
        store.set_offline(true);
        engine.add_entity("Museos", "Museo Casa de Delio Panizza", -32.48, -58.23).await.unwrap();
        store.set_offline(false);
        store.fail_searches(true);

        let diagnostics = engine.diagnostics().await;
        assert!(diagnostics.store_available);
        assert_eq!(diagnostics.categories.len(), 6);
        let museos = diagnostics.categories.iter().find(|c| c.category == "Museos").unwrap();
        assert_eq!(museos.fallback_count, 1);
        assert!(museos.error.is_some());

        store.fail_searches(false);
        let diagnostics = engine.diagnostics().await;
        let farmacias = &diagnostics.categories[2];
        assert_eq!(farmacias.primary_count, Some(3));
        assert_eq!(farmacias.samples.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_context_routes_to_fallback() {
        let store = Arc::new(MemoryGeoStore::new());
        let engine = engine(&store);
        engine.close().await;

        let results = engine
            .find_nearby("Farmacias", -32.4877, -58.2342, Some(1.0))
            .await
            .unwrap();
        assert_eq!(results.provenance, Provenance::Fallback);
        assert!(!engine.self_test().await.passed);
        assert_eq!(store.ping_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_entity_reports_every_rule() {
        let store = Arc::new(MemoryGeoStore::new());
        let err = engine(&store)
            .add_entity(" ", "", 95.0, 200.0)
            .await
            .unwrap_err();
        match err {
            LocatorError::InvalidInput(messages) => {
                assert_eq!(messages.len(), 4);
                assert!(messages.iter().any(|m| m.starts_with("latitude")));
                assert!(messages.iter().any(|m| m.starts_with("longitude")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
