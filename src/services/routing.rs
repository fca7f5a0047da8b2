// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route planning over OSRM.
//!
//! Handles:
//! - Coordinate path building (`lon,lat;lon,lat`)
//! - Encoded polyline (precision 5) and GeoJSON geometries
//! - `NoRoute` as an empty result rather than an error

use std::sync::Arc;

use async_trait::async_trait;
use geo::LineString;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{LatLon, RouteCandidate};

/// Turn-by-turn routing backend.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Candidate paths through `stops` in order; primary first.
    async fn route(&self, stops: &[LatLon]) -> Result<Vec<RouteCandidate>, AppError>;
}

/// OSRM HTTP client.
#[derive(Clone)]
pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
    profile: String,
    alternatives: bool,
}

impl OsrmClient {
    pub fn new(http: reqwest::Client, base_url: &str, profile: &str, alternatives: bool) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
            alternatives,
        }
    }

    /// Full request URL for a set of stops.
    pub fn route_url(&self, stops: &[LatLon]) -> String {
        let path = stops
            .iter()
            .map(LatLon::to_osrm_pair)
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=polyline&alternatives={}",
            self.base_url, self.profile, path, self.alternatives
        )
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

/// `geometries=polyline` yields a string; `geometries=geojson` an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OsrmGeometry {
    Encoded(String),
    GeoJson(geojson::Geometry),
}

impl OsrmGeometry {
    fn into_line_string(self) -> Result<LineString<f64>, AppError> {
        match self {
            OsrmGeometry::Encoded(encoded) => polyline::decode_polyline(&encoded, 5)
                .map_err(|e| AppError::Routing(format!("Failed to decode polyline: {}", e))),
            OsrmGeometry::GeoJson(geometry) => geometry
                .value
                .try_into()
                .map_err(|e: geojson::Error| AppError::Routing(format!("Bad geometry: {}", e))),
        }
    }
}

fn parse_osrm(response: OsrmResponse) -> Result<Vec<RouteCandidate>, AppError> {
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Ok(Vec::new()),
        code => {
            return Err(AppError::Routing(format!(
                "{}: {}",
                code,
                response.message.unwrap_or_default()
            )))
        }
    }

    response
        .routes
        .into_iter()
        .map(|r| {
            Ok(RouteCandidate {
                geometry: r.geometry.into_line_string()?,
                distance_meters: r.distance,
                duration_seconds: r.duration,
            })
        })
        .collect()
}

#[async_trait]
impl RouteProvider for OsrmClient {
    async fn route(&self, stops: &[LatLon]) -> Result<Vec<RouteCandidate>, AppError> {
        let url = self.route_url(stops);
        tracing::debug!(url = %url, "Requesting OSRM route");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Routing(e.to_string()))?;

        // OSRM reports NoRoute and friends with a 400 and a JSON body.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Routing(e.to_string()))?;

        match serde_json::from_str::<OsrmResponse>(&body) {
            Ok(parsed) => parse_osrm(parsed),
            Err(e) if status.is_success() => {
                Err(AppError::Routing(format!("JSON parse error: {}", e)))
            }
            Err(_) => Err(AppError::Routing(format!("HTTP {}: {}", status, body))),
        }
    }
}

/// Validates stops and asks the provider for candidates. No retry.
#[derive(Clone)]
pub struct RoutePlanner {
    provider: Arc<dyn RouteProvider>,
}

impl RoutePlanner {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    /// Candidate routes through `stops`. An empty vector means no path exists.
    pub async fn plan_route(&self, stops: &[LatLon]) -> Result<Vec<RouteCandidate>, AppError> {
        if stops.len() < 2 {
            return Err(AppError::Validation(
                "A route needs both a start and a destination.".to_string(),
            ));
        }
        if let Some(bad) = stops.iter().find(|s| !s.is_valid()) {
            return Err(AppError::Validation(format!(
                "Invalid coordinate: {}, {}",
                bad.lat, bad.lon
            )));
        }

        let candidates = self.provider.route(stops).await?;
        tracing::debug!(stops = stops.len(), candidates = candidates.len(), "Route planned");
        Ok(candidates)
    }
}
