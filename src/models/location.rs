// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coordinates and the rider location record.

use chrono::{DateTime, Utc};
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use super::{DecodeError, StoredTimestamp};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True if both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// `lon,lat` as OSRM expects it.
    pub fn to_osrm_pair(&self) -> String {
        format!("{},{}", self.lon, self.lat)
    }
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

impl From<Coord<f64>> for LatLon {
    fn from(c: Coord<f64>) -> Self {
        LatLon { lat: c.y, lon: c.x }
    }
}

/// Axis-aligned view bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLon,
    pub north_east: LatLon,
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Bounds {
            south_west: rect.min().into(),
            north_east: rect.max().into(),
        }
    }
}

/// Latest known position of a rider (one record per rider, overwritten).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderLocation {
    pub rider_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_updated: DateTime<Utc>,
}

impl RiderLocation {
    pub fn new(rider_id: &str, at: LatLon, now: DateTime<Utc>) -> Self {
        Self {
            rider_id: rider_id.to_string(),
            latitude: at.lat,
            longitude: at.lon,
            last_updated: now,
        }
    }

    pub fn from_document(rider_id: &str, doc: RiderLocationDocument) -> Result<Self, DecodeError> {
        Ok(Self {
            rider_id: rider_id.to_string(),
            latitude: doc.latitude,
            longitude: doc.longitude,
            last_updated: doc.last_updated.decode()?,
        })
    }

    pub fn to_document(&self) -> RiderLocationDocument {
        RiderLocationDocument {
            latitude: self.latitude,
            longitude: self.longitude,
            last_updated: StoredTimestamp::from_utc(self.last_updated),
        }
    }
}

/// Stored shape of `riderLocations/{riderId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderLocationDocument {
    pub latitude: f64,
    pub longitude: f64,
    pub last_updated: StoredTimestamp,
}
