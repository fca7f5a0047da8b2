// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live trip tracking routes.

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::LatLon;
use crate::view::ViewSnapshot;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trips/start", post(start_trip))
        .route("/api/trips/position", post(push_position))
        .route("/api/trips/stop", post(stop_trip))
}

#[derive(Serialize)]
pub struct TripStarted {
    pub tracking: bool,
    pub view: ViewSnapshot,
}

#[derive(Serialize)]
pub struct TripStopped {
    /// False if no trip was running
    pub stopped: bool,
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TripStarted>> {
    state.tracker.start(&user.uid).await?;
    Ok(Json(TripStarted {
        tracking: true,
        view: state.views.snapshot(&user.uid).await,
    }))
}

/// Queue a device position; it is applied asynchronously.
async fn push_position(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(at): Json<LatLon>,
) -> Result<StatusCode> {
    state.tracker.push(&user.uid, at).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn stop_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<TripStopped> {
    Json(TripStopped {
        stopped: state.tracker.stop(&user.uid),
    })
}
