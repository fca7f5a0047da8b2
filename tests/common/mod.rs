// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use geo::LineString;
use ontheway::config::Config;
use ontheway::db::{FirestoreDb, MemoryStore, RideStore};
use ontheway::error::AppError;
use ontheway::middleware::auth::create_jwt;
use ontheway::models::{LatLon, Role, RouteCandidate, User};
use ontheway::routes::create_router;
use ontheway::services::{
    AddressResolver, Geocoder, MemoryIdentityProvider, Place, RouteProvider, RoutePlanner,
};
use ontheway::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Places the fake geocoder knows about.
pub const PLACES: &[(&str, f64, f64)] = &[
    ("Union Square, San Francisco", 37.7880, -122.4075),
    ("Ferry Building, San Francisco", 37.7955, -122.3937),
    ("Coit Tower, San Francisco", 37.8024, -122.4058),
];

/// Geocoder over a fixed table. Matching is a case-insensitive substring test.
#[derive(Default)]
pub struct FakeGeocoder;

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Place>, AppError> {
        let query = query.to_lowercase();
        Ok(PLACES
            .iter()
            .filter(|(name, _, _)| name.to_lowercase().contains(&query))
            .take(limit as usize)
            .map(|(name, lat, lon)| Place {
                lat: *lat,
                lon: *lon,
                display_name: name.to_string(),
            })
            .collect())
    }

    async fn reverse(&self, _at: LatLon) -> Result<Option<String>, AppError> {
        Ok(Some("Market Street, San Francisco".to_string()))
    }
}

/// Router returning a primary and an alternate straight-line route.
#[derive(Default)]
pub struct FakeRouter {
    pub fail: AtomicBool,
    pub no_route: AtomicBool,
}

#[async_trait]
impl RouteProvider for FakeRouter {
    async fn route(&self, stops: &[LatLon]) -> Result<Vec<RouteCandidate>, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Routing("connection refused".to_string()));
        }
        if self.no_route.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let line: LineString<f64> = stops.iter().map(|p| (p.lon, p.lat)).collect::<Vec<_>>().into();
        Ok(vec![
            RouteCandidate {
                geometry: line.clone(),
                distance_meters: 2_500.0,
                duration_seconds: 420.0,
            },
            RouteCandidate {
                geometry: line,
                distance_meters: 3_100.0,
                duration_seconds: 540.0,
            },
        ])
    }
}

/// App wired to in-memory backends, plus handles to inspect them.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub identity: Arc<MemoryIdentityProvider>,
    pub routing: Arc<FakeRouter>,
}

/// Create a test app with in-memory dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let store = MemoryStore::new();
    let identity = Arc::new(MemoryIdentityProvider::new());
    let routing = Arc::new(FakeRouter::default());

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        identity.clone(),
        AddressResolver::new(Arc::new(FakeGeocoder)),
        RoutePlanner::new(routing.clone()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        identity,
        routing,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Write a profile directly and return a session token for it.
    pub async fn seed_user(&self, uid: &str, role: Role) -> String {
        let user = User {
            uid: uid.to_string(),
            name: format!("User {}", uid),
            email: format!("{}@example.com", uid),
            role,
            created_at: Some(chrono::Utc::now()),
        };
        self.store.create_user(&user).await.unwrap();
        create_test_jwt(&user, &self.state.config.jwt_signing_key)
    }

    /// Send a request and return status, headers and the JSON body (Null if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, headers, json)
    }

    pub async fn get(
        &self,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, HeaderMap, serde_json::Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, HeaderMap, serde_json::Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }
}

/// Build a request with an optional Bearer token and JSON body.
#[allow(dead_code)]
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user: &User, signing_key: &[u8]) -> String {
    create_jwt(user, signing_key).unwrap()
}

/// All `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}
