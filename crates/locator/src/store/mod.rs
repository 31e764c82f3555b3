//! Geospatial store backends
//!
//! [`GeoStore`] is the seam between the adapter and a concrete store.
//! [`RedisGeoStore`] talks to Redis; [`MemoryGeoStore`] is an in-process
//! stand-in with switchable faults.

mod connection;
mod memory;
mod redis;

pub use self::connection::{Admission, ConnectionMachine, ConnectionState};
pub use self::memory::MemoryGeoStore;
pub use self::redis::RedisGeoStore;

use crate::error::Result;
use async_trait::async_trait;
use geofinder_geo::Coordinate;

/// Operations the adapter needs from a geo-capable key/value store
///
/// Connection failures are `StoreUnavailable`. Command failures on a
/// reachable store are `StoreReadFailed` or `StoreWriteFailed`.
#[async_trait]
pub trait GeoStore: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Liveness check. The only call allowed to revive a dead connection.
    async fn ping(&self) -> Result<()>;

    /// Add or move `member` in collection `key`
    async fn geo_add(&self, key: &str, coordinate: Coordinate, member: &str) -> Result<()>;

    /// Members of `key` within `radius_km` of `center`, without coordinates
    /// or distances
    async fn geo_search(&self, key: &str, center: Coordinate, radius_km: f64) -> Result<Vec<String>>;

    /// Stored position of one member, `None` when it is not in the collection
    async fn geo_pos(&self, key: &str, member: &str) -> Result<Option<Coordinate>>;

    /// Remove a whole collection
    async fn delete(&self, key: &str) -> Result<()>;

    /// Server version string
    async fn server_version(&self) -> Result<String>;

    /// Release the connection. Safe to call more than once.
    async fn close(&self);
}
