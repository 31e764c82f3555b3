//! In-process geo store with switchable faults

use super::GeoStore;
use crate::error::{LocatorError, Result};
use async_trait::async_trait;
use geofinder_geo::{haversine_distance, Coordinate};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latitude limit of geohash-indexed stores
const GEO_LATITUDE_LIMIT: f64 = 85.051_128_78;

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, Vec<(String, Coordinate)>>,
    offline: bool,
    failing_writes: bool,
    failing_searches: bool,
    failing_positions: HashSet<String>,
    pings: usize,
    closes: usize,
}

/// A geo store kept in a map
///
/// Radius membership is exact Haversine, inclusive, in insertion order.
/// Faults are toggled at runtime so one store can serve both the primary
/// and the fallback path of a test.
#[derive(Debug, Default)]
pub struct MemoryGeoStore {
    state: Mutex<MemoryState>,
}

impl MemoryGeoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every call
    pub fn offline() -> Self {
        let store = Self::new();
        store.set_offline(true);
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call fails with `StoreUnavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// `geo_add` and `delete` fail with `StoreWriteFailed` while set
    pub fn fail_writes(&self, failing: bool) {
        self.lock().failing_writes = failing;
    }

    /// `geo_search` fails with `StoreReadFailed` while set
    pub fn fail_searches(&self, failing: bool) {
        self.lock().failing_searches = failing;
    }

    /// `geo_pos` fails for this member
    pub fn fail_position_of(&self, member: impl Into<String>) {
        self.lock().failing_positions.insert(member.into());
    }

    /// Insert a member verbatim, bypassing faults
    pub fn insert_raw(&self, key: &str, coordinate: Coordinate, member: &str) {
        upsert(&mut self.lock(), key, coordinate, member);
    }

    /// Members of a collection in insertion order
    pub fn members(&self, key: &str) -> Vec<String> {
        self.lock()
            .collections
            .get(key)
            .map(|entries| entries.iter().map(|(m, _)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of members in a collection
    pub fn len(&self, key: &str) -> usize {
        self.lock().collections.get(key).map_or(0, Vec::len)
    }

    /// True when no collection exists
    pub fn is_empty(&self) -> bool {
        self.lock().collections.is_empty()
    }

    pub fn ping_count(&self) -> usize {
        self.lock().pings
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    fn online(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.offline {
            return Err(LocatorError::StoreUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(state)
    }
}

fn upsert(state: &mut MemoryState, key: &str, coordinate: Coordinate, member: &str) {
    let entries = state.collections.entry(key.to_string()).or_default();
    match entries.iter_mut().find(|(m, _)| m == member) {
        Some(entry) => entry.1 = coordinate,
        None => entries.push((member.to_string(), coordinate)),
    }
}

#[async_trait]
impl GeoStore for MemoryGeoStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        let mut state = self.lock();
        state.pings += 1;
        if state.offline {
            return Err(LocatorError::StoreUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn geo_add(&self, key: &str, coordinate: Coordinate, member: &str) -> Result<()> {
        let mut state = self.online()?;
        if state.failing_writes {
            return Err(LocatorError::StoreWriteFailed(format!("GEOADD {key} rejected")));
        }
        if !coordinate.is_valid() || coordinate.latitude.abs() > GEO_LATITUDE_LIMIT {
            return Err(LocatorError::StoreWriteFailed(format!(
                "invalid longitude,latitude pair {},{}",
                coordinate.longitude, coordinate.latitude
            )));
        }
        upsert(&mut state, key, coordinate, member);
        Ok(())
    }

    async fn geo_search(&self, key: &str, center: Coordinate, radius_km: f64) -> Result<Vec<String>> {
        let state = self.online()?;
        if state.failing_searches {
            return Err(LocatorError::StoreReadFailed(format!("GEOSEARCH {key} rejected")));
        }
        Ok(state
            .collections
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, coord)| haversine_distance(&center, coord) <= radius_km)
                    .map(|(member, _)| member.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn geo_pos(&self, key: &str, member: &str) -> Result<Option<Coordinate>> {
        let state = self.online()?;
        if state.failing_positions.contains(member) {
            return Err(LocatorError::StoreReadFailed(format!("GEOPOS {key} failed")));
        }
        Ok(state
            .collections
            .get(key)
            .and_then(|entries| entries.iter().find(|(m, _)| m == member))
            .map(|(_, coord)| *coord))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.online()?;
        if state.failing_writes {
            return Err(LocatorError::StoreWriteFailed(format!("DEL {key} rejected")));
        }
        state.collections.remove(key);
        Ok(())
    }

    async fn server_version(&self) -> Result<String> {
        self.online()?;
        Ok(concat!("memory-", env!("CARGO_PKG_VERSION")).to_string())
    }

    async fn close(&self) {
        self.lock().closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "locations:Farmacias";

    #[tokio::test]
    async fn test_add_search_pos() {
        let store = MemoryGeoStore::new();
        let center = Coordinate::new(-32.4877, -58.2342);
        store.geo_add(KEY, Coordinate::new(-32.4889, -58.2356), "a").await.unwrap();
        store.geo_add(KEY, Coordinate::new(-32.480666, -58.262164), "far").await.unwrap();

        let found = store.geo_search(KEY, center, 1.0).await.unwrap();
        assert_eq!(found, vec!["a".to_string()]);

        let pos = store.geo_pos(KEY, "a").await.unwrap().unwrap();
        assert_eq!(pos, Coordinate::new(-32.4889, -58.2356));
        assert!(store.geo_pos(KEY, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_geo_add_moves_existing_member() {
        let store = MemoryGeoStore::new();
        store.geo_add(KEY, Coordinate::new(1.0, 1.0), "a").await.unwrap();
        store.geo_add(KEY, Coordinate::new(2.0, 2.0), "a").await.unwrap();
        assert_eq!(store.len(KEY), 1);
        assert_eq!(
            store.geo_pos(KEY, "a").await.unwrap(),
            Some(Coordinate::new(2.0, 2.0))
        );
    }

    #[tokio::test]
    async fn test_faults() {
        let store = MemoryGeoStore::new();
        store.fail_writes(true);
        assert!(matches!(
            store.geo_add(KEY, Coordinate::new(1.0, 1.0), "a").await,
            Err(LocatorError::StoreWriteFailed(_))
        ));

        store.fail_writes(false);
        store.fail_searches(true);
        assert!(matches!(
            store.geo_search(KEY, Coordinate::NULL_ISLAND, 1.0).await,
            Err(LocatorError::StoreReadFailed(_))
        ));

        store.fail_position_of("a");
        assert!(store.geo_pos(KEY, "a").await.is_err());

        store.set_offline(true);
        assert!(matches!(store.ping().await, Err(LocatorError::StoreUnavailable(_))));
        assert_eq!(store.ping_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_polar_latitudes() {
        let store = MemoryGeoStore::new();
        assert!(matches!(
            store.geo_add(KEY, Coordinate::new(89.0, 0.0), "pole").await,
            Err(LocatorError::StoreWriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_close() {
        let store = MemoryGeoStore::new();
        store.insert_raw(KEY, Coordinate::new(1.0, 1.0), "raw");
        assert_eq!(store.members(KEY), vec!["raw".to_string()]);
        store.delete(KEY).await.unwrap();
        assert!(store.is_empty());

        store.close().await;
        store.close().await;
        assert_eq!(store.close_count(), 2);
    }
}
