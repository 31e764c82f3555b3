//! Shared resources of the engine with an explicit open/close lifecycle

use crate::adapter::GeoStoreAdapter;
use crate::error::{LocatorError, Result};
use crate::fallback::FallbackStore;
use crate::ids::IdGenerator;
use crate::store::{GeoStore, RedisGeoStore};
use geofinder_core::config::{ConfigSchema, SearchConfig};
use geofinder_telemetry::MetricsRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// The store connection, the fallback map, the id source and the counters
///
/// One context is opened per process and handed to the engine. Tests build
/// one around a [`MemoryGeoStore`](crate::store::MemoryGeoStore).
pub struct LocatorContext {
    adapter: GeoStoreAdapter,
    fallback: FallbackStore,
    ids: IdGenerator,
    metrics: Arc<MetricsRegistry>,
    search: SearchConfig,
    closed: AtomicBool,
}

impl LocatorContext {
    /// Context over Redis as configured. The connection is made lazily by
    /// the first availability probe.
    pub fn open(config: &ConfigSchema) -> Result<Self> {
        let store = RedisGeoStore::from_config(&config.store)?;
        info!(url = %config.store.url, "Locator context opened");
        Ok(Self::with_store(Arc::new(store), &config.search))
    }

    /// Context over any store
    pub fn with_store(store: Arc<dyn GeoStore>, search: &SearchConfig) -> Self {
        Self {
            adapter: GeoStoreAdapter::new(store, search.key_prefix.clone()),
            fallback: FallbackStore::new(),
            ids: IdGenerator::new(),
            metrics: Arc::new(MetricsRegistry::new()),
            search: search.clone(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn adapter(&self) -> &GeoStoreAdapter {
        &self.adapter
    }

    pub fn fallback(&self) -> &FallbackStore {
        &self.fallback
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn default_radius_km(&self) -> f64 {
        self.search.default_radius_km
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the store connection once; later calls do nothing
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.adapter.close().await;
        info!("Locator context closed");
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LocatorError::StoreUnavailable("context is closed".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGeoStore;

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = Arc::new(MemoryGeoStore::new());
        let ctx = LocatorContext::with_store(store.clone(), &SearchConfig::default());
        assert!(!ctx.is_closed());
        assert!(ctx.ensure_open().is_ok());

        ctx.close().await;
        ctx.close().await;
        assert!(ctx.is_closed());
        assert_eq!(store.close_count(), 1);
        assert!(ctx.ensure_open().is_err());
    }

    #[test]
    fn test_open_from_default_config() {
        let ctx = LocatorContext::open(&ConfigSchema::default()).unwrap();
        assert_eq!(ctx.adapter().backend(), "redis");
        assert_eq!(ctx.default_radius_km(), 5.0);
        assert_eq!(ctx.adapter().key("Farmacias"), "locations:Farmacias");
    }
}
