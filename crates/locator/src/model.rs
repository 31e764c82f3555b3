//! Place records and query results

use crate::error::{LocatorError, Result};
use chrono::{DateTime, Utc};
use geofinder_geo::{Coordinate, Located};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which backing served a read or took a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The geospatial store
    Primary,
    /// The in-process fallback store
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub coordinate: Coordinate,
    pub created_at: DateTime<Utc>,
}

impl Place {
    /// The record stored as a geo member. Coordinates stay out of it.
    pub fn payload(&self) -> PlacePayload {
        PlacePayload {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }

    pub(crate) fn into_nearby(self, distance_km: f64) -> NearbyPlace {
        NearbyPlace {
            id: self.id,
            name: self.name,
            category: self.category,
            lat: self.coordinate.latitude,
            lng: self.coordinate.longitude,
            distance_km,
            created_at: self.created_at,
        }
    }
}

impl Located for Place {
    fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

/// Serialized identity of a place inside a geo collection
///
/// Two places with byte-identical payloads are the same member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePayload {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl PlacePayload {
    /// Encode as the member string
    pub fn to_member(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LocatorError::StoreWriteFailed(format!("cannot encode payload: {e}")))
    }

    /// Decode a member string. Malformed JSON, missing fields and blank
    /// names are all parse failures.
    pub fn parse(member: &str) -> Result<Self> {
        let payload: Self = serde_json::from_str(member)
            .map_err(|e| LocatorError::PayloadParseFailed(e.to_string()))?;
        if payload.name.trim().is_empty() {
            return Err(LocatorError::PayloadParseFailed(format!(
                "place {} has an empty name",
                payload.id
            )));
        }
        Ok(payload)
    }
}

/// One row of a proximity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlace {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    /// Full precision; round only for display
    pub distance_km: f64,
    pub created_at: DateTime<Utc>,
}

impl NearbyPlace {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Result of a proximity query with the path that served it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyResults {
    pub provenance: Provenance,
    pub places: Vec<NearbyPlace>,
}

impl NearbyResults {
    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Whether a place with this id is in the result
    pub fn contains(&self, id: i64) -> bool {
        self.places.iter().any(|p| p.id == id)
    }
}

/// A newly created place and where it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlace {
    pub provenance: Provenance,
    pub place: Place,
}

/// Outcome of reseeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub provenance: Provenance,
    pub inserted: usize,
    pub per_category: BTreeMap<String, usize>,
}
