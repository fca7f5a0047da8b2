// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Address resolution over Nominatim.
//!
//! `NominatimClient` speaks HTTP and reports errors; `AddressResolver`
//! applies the lookup rules (minimum query length, result limits) and turns
//! every failure into "no result" after logging it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::LatLon;

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_CHARS: usize = 3;
/// Suggestions shown by the autocomplete list.
pub const SUGGESTION_LIMIT: u32 = 5;

/// A resolved place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

impl Place {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Forward and reverse geocoding backend.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Ranked matches for free text.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Place>, AppError>;

    /// Human-readable address for a coordinate, if any.
    async fn reverse(&self, at: LatLon) -> Result<Option<String>, AppError>;
}

/// Nominatim HTTP client.
#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                tracing::warn!("Nominatim rate limit hit (429)");
            }
            return Err(AppError::Geocoding(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Geocoding(format!("JSON parse error: {}", e)))
    }
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl TryFrom<NominatimPlace> for Place {
    type Error = AppError;

    fn try_from(p: NominatimPlace) -> Result<Self, Self::Error> {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| AppError::Geocoding(format!("Invalid coordinate: {}", s)))
        };
        Ok(Place {
            lat: parse(&p.lat)?,
            lon: parse(&p.lon)?,
            display_name: p.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Place>, AppError> {
        let url = format!("{}/search", self.base_url);
        let limit = limit.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Geocoding(e.to_string()))?;

        let places: Vec<NominatimPlace> = Self::check_response_json(response).await?;
        places.into_iter().map(Place::try_from).collect()
    }

    async fn reverse(&self, at: LatLon) -> Result<Option<String>, AppError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Geocoding(e.to_string()))?;

        let reverse: NominatimReverse = Self::check_response_json(response).await?;
        Ok(reverse.display_name)
    }
}

/// Address lookups with the booking form's rules applied.
///
/// Never fails: errors are logged and surface as "no result". No caching;
/// repeated queries re-fetch.
#[derive(Clone)]
pub struct AddressResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// True if `text` is long enough to be looked up.
    pub fn is_searchable(text: &str) -> bool {
        text.trim().chars().count() >= MIN_QUERY_CHARS
    }

    /// Best single match for free text.
    pub async fn forward_geocode(&self, text: &str) -> Option<Place> {
        self.search(text, 1).await.into_iter().next()
    }

    /// Up to five matches for the autocomplete list.
    pub async fn suggest(&self, text: &str) -> Vec<Place> {
        self.search(text, SUGGESTION_LIMIT).await
    }

    /// Readable address for a coordinate.
    pub async fn reverse_geocode(&self, at: LatLon) -> Option<String> {
        match self.geocoder.reverse(at).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(lat = at.lat, lon = at.lon, error = %e, "Reverse geocoding failed");
                None
            }
        }
    }

    async fn search(&self, text: &str, limit: u32) -> Vec<Place> {
        let query = text.trim();
        if !Self::is_searchable(query) {
            return Vec::new();
        }

        match self.geocoder.search(query, limit).await {
            Ok(places) => places,
            Err(e) => {
                tracing::warn!(query, error = %e, "Geocoding failed");
                Vec::new()
            }
        }
    }
}
