//! Proximity queries over per-category point collections
//!
//! The [`ProximityEngine`] answers "what is near here" for one category at a
//! time. It prefers a Redis geo index and falls back to an in-process store
//! whenever Redis is unreachable or misbehaves, tagging each answer with the
//! [`Provenance`] that produced it.
//!
//! # Example
//!
//! ```rust
//! use geofinder_core::config::SearchConfig;
//! use geofinder_locator::store::MemoryGeoStore;
//! use geofinder_locator::{LocatorContext, ProximityEngine, Provenance};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryGeoStore::offline());
//! let engine = ProximityEngine::new(LocatorContext::with_store(store, &SearchConfig::default()));
//!
//! let nearby = engine.find_nearby("Farmacias", -32.4877, -58.2342, Some(1.0)).await.unwrap();
//! assert_eq!(nearby.provenance, Provenance::Fallback);
//! assert_eq!(nearby.len(), 3);
//! # });
//! ```

pub mod adapter;
pub mod context;
pub mod engine;
mod error;
pub mod fallback;
mod ids;
pub mod model;
pub mod seed;
pub mod store;

pub use adapter::{DistanceUnit, GeoMatch, GeoStoreAdapter, SearchOptions, SelfTestReport};
pub use context::LocatorContext;
pub use engine::{CategoryDiagnostics, Diagnostics, ProximityEngine};
pub use error::{LocatorError, LocatorErrorCode, Result};
pub use fallback::FallbackStore;
pub use ids::IdGenerator;
pub use model::{CreatedPlace, NearbyPlace, NearbyResults, Place, PlacePayload, Provenance, SeedReport};
