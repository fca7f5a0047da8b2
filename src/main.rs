// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OnTheWay API Server
//!
//! Ride booking backend: passengers and riders sign in, pick places on a
//! map, see live routes, book rides and share their location.

use ontheway::{
    config::{Backend, Config},
    db::{FirestoreDb, MemoryStore, RideStore},
    services::{
        AddressResolver, FirebaseAuthClient, IdentityProvider, MemoryIdentityProvider,
        NominatimClient, OsrmClient, RoutePlanner,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.backend, "Starting OnTheWay API");

    let http = config.http_client();

    // Identity and document store
    let (store, identity): (Arc<dyn RideStore>, Arc<dyn IdentityProvider>) = match config.backend
    {
        Backend::Firebase => {
            let db = FirestoreDb::new(&config.gcp_project_id)
                .await?
                .with_poll_interval(config.notification_poll);
            let auth = FirebaseAuthClient::new(http.clone(), &config.firebase_api_key);
            (Arc::new(db), Arc::new(auth))
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory identity and store; data is lost on restart");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryIdentityProvider::new()),
            )
        }
    };

    // Geocoding and routing
    let resolver = AddressResolver::new(Arc::new(NominatimClient::new(
        http.clone(),
        &config.nominatim_url,
    )));
    let planner = RoutePlanner::new(Arc::new(OsrmClient::new(
        http,
        &config.osrm_url,
        &config.osrm_profile,
        config.route_alternatives,
    )));
    tracing::info!(
        nominatim = %config.nominatim_url,
        osrm = %config.osrm_url,
        "Map services configured"
    );

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, store, identity, resolver, planner));

    // Build router
    let app = ontheway::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ontheway=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
