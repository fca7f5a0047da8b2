// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route candidate returned by the routing service (transient).

use geo::{BoundingRect, LineString};

use super::{Bounds, LatLon};

/// One possible path for a set of stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    /// Path geometry (x = lon, y = lat)
    pub geometry: LineString<f64>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteCandidate {
    /// Distance in kilometres.
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    /// Duration in whole minutes, rounded up.
    pub fn duration_minutes(&self) -> u64 {
        (self.duration_seconds / 60.0).ceil().max(0.0) as u64
    }

    /// Popup text, e.g. `Route 1: 12.34 km, 15 mins`.
    pub fn summary(&self, index: usize) -> String {
        format!(
            "Route {}: {:.2} km, {} mins",
            index + 1,
            self.distance_km(),
            self.duration_minutes()
        )
    }

    /// Geometry as `(lat, lon)` points for the map widget.
    pub fn points(&self) -> Vec<LatLon> {
        self.geometry.coords().map(|c| LatLon::from(*c)).collect()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.bounding_rect().map(Bounds::from)
    }
}
