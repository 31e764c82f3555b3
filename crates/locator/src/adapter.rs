//! Geo Store Adapter
//!
//! Maps categories to collection keys, writes place payloads as members,
//! and turns member-only search replies into [`GeoMatch`] rows. The store's
//! own combined distance/coordinate replies are never used: positions are
//! fetched per member and distances recomputed with Haversine.

use crate::error::Result;
use crate::model::Place;
use crate::store::GeoStore;
use chrono::Utc;
use geofinder_geo::{haversine_distance, Coordinate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Unit for radii and reported distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    Meters,
    #[default]
    Kilometers,
}

impl DistanceUnit {
    pub fn to_km(self, value: f64) -> f64 {
        match self {
            Self::Meters => value / 1000.0,
            Self::Kilometers => value,
        }
    }

    pub fn from_km(self, km: f64) -> f64 {
        match self {
            Self::Meters => km * 1000.0,
            Self::Kilometers => km,
        }
    }
}

/// What to resolve for each matched member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub with_coord: bool,
    pub with_dist: bool,
}

impl SearchOptions {
    pub fn full() -> Self {
        Self {
            with_coord: true,
            with_dist: true,
        }
    }
}

/// One member of a radius search
///
/// `coordinates` and `distance` are `None` when not requested or when the
/// position lookup for this member failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMatch {
    pub member: String,
    pub coordinates: Option<Coordinate>,
    pub distance: Option<f64>,
}

/// Outcome of [`GeoStoreAdapter::self_test`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfTestReport {
    pub passed: bool,
    pub backend: String,
    pub matches: usize,
    pub detail: String,
}

const SELF_TEST_CENTER: Coordinate = Coordinate {
    latitude: -32.4877,
    longitude: -58.2342,
};

/// Translates engine calls into [`GeoStore`] commands
#[derive(Clone)]
pub struct GeoStoreAdapter {
    store: Arc<dyn GeoStore>,
    key_prefix: String,
}

impl GeoStoreAdapter {
    pub fn new(store: Arc<dyn GeoStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Collection key of a category
    pub fn key(&self, category: &str) -> String {
        format!("{}:{}", self.key_prefix, category)
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Ping the store. Never errors; any failure means unavailable.
    pub async fn is_available(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(backend = self.backend(), error = %e, "Store probe failed");
                false
            }
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    pub async fn server_version(&self) -> Result<String> {
        self.store.server_version().await
    }

    /// Store a place's coordinates with its payload as the member
    pub async fn add_point(&self, category: &str, place: &Place) -> Result<()> {
        let member = place.payload().to_member()?;
        self.store
            .geo_add(&self.key(category), place.coordinate, &member)
            .await
    }

    /// Radius search tolerant of per-member failures.
    ///
    /// The member search itself failing is an error. A failed position
    /// lookup only blanks that member's coordinates and distance.
    pub async fn radius_search(
        &self,
        category: &str,
        center: Coordinate,
        radius: f64,
        unit: DistanceUnit,
        options: SearchOptions,
    ) -> Result<Vec<GeoMatch>> {
        let key = self.key(category);
        let members = self.store.geo_search(&key, center, unit.to_km(radius)).await?;
        debug!(key = %key, count = members.len(), "Radius search matched members");

        let mut matches = Vec::with_capacity(members.len());
        for member in members {
            let position = if options.with_coord || options.with_dist {
                match self.store.geo_pos(&key, &member).await {
                    Ok(position) => position,
                    Err(e) => {
                        warn!(key = %key, member = %member, error = %e, "Position lookup failed");
                        None
                    }
                }
            } else {
                None
            };

            let distance = match position {
                Some(coord) if options.with_dist => {
                    Some(unit.from_km(haversine_distance(&center, &coord)))
                }
                _ => None,
            };

            matches.push(GeoMatch {
                member,
                coordinates: position.filter(|_| options.with_coord),
                distance,
            });
        }
        Ok(matches)
    }

    /// Number of members within 100 m of a fresh insert
    pub async fn verify_insert(&self, category: &str, coordinate: Coordinate) -> Result<usize> {
        let members = self
            .store
            .geo_search(&self.key(category), coordinate, 0.1)
            .await?;
        Ok(members.len())
    }

    /// Remove a category's collection
    pub async fn clear(&self, category: &str) -> Result<()> {
        self.store.delete(&self.key(category)).await
    }

    /// Write a probe into a scratch key, find it again, clean up
    pub async fn self_test(&self) -> Result<SelfTestReport> {
        let scratch = GeoStoreAdapter::new(Arc::clone(&self.store), "test");
        let category = self.key_prefix.as_str();
        let key = scratch.key(category);

        self.store.delete(&key).await?;
        let probe = Place {
            id: 1,
            name: "Test Location".to_string(),
            category: category.to_string(),
            coordinate: SELF_TEST_CENTER,
            created_at: Utc::now(),
        };
        let member = probe.payload().to_member()?;
        scratch.add_point(category, &probe).await?;

        let outcome = scratch
            .radius_search(
                category,
                SELF_TEST_CENTER,
                1.0,
                DistanceUnit::Kilometers,
                SearchOptions::full(),
            )
            .await;
        let cleanup = self.store.delete(&key).await;
        let matches = outcome?;
        cleanup?;

        let found = matches.iter().find(|m| m.member == member);
        let (passed, detail) = match found {
            Some(GeoMatch {
                coordinates: Some(coord),
                distance: Some(distance),
                ..
            }) if *distance < 0.01 => (
                true,
                format!("probe found at {:.5},{:.5}", coord.latitude, coord.longitude),
            ),
            Some(_) => (false, "probe found without a usable position".to_string()),
            None => (false, "probe not found by radius search".to_string()),
        };

        Ok(SelfTestReport {
            passed,
            backend: self.backend().to_string(),
            matches: matches.len(),
            detail,
        })
    }

    /// Release the store connection
    pub async fn close(&self) {
        self.store.close().await;
    }
}
