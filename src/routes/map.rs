// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking map routes: initialization, autocomplete fields, current view.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::LatLon;
use crate::services::autocomplete::InputOutcome;
use crate::services::FieldKind;
use crate::view::ViewSnapshot;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/map", get(get_view))
        .route("/api/map/init", post(init))
        .route("/api/map/{field}/input", post(input))
        .route("/api/map/{field}/select", post(select))
        .route("/api/map/{field}/enter", post(enter))
        .route("/api/map/{field}/dismiss", post(dismiss))
}

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ViewSnapshot> {
    Json(state.views.snapshot(&user.uid).await)
}

/// Center the map on the device position.
async fn init(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(at): Json<LatLon>,
) -> Result<Json<ViewSnapshot>> {
    if !at.is_valid() {
        return Err(AppError::BadRequest(format!(
            "Invalid coordinates: {}, {}",
            at.lat, at.lon
        )));
    }
    Ok(Json(state.views.init(&user.uid, at).await))
}

async fn input(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(field): Path<FieldKind>,
    Json(req): Json<TextRequest>,
) -> Json<InputOutcome> {
    Json(state.views.input(&user.uid, field, &req.text).await)
}

async fn select(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(field): Path<FieldKind>,
    Json(req): Json<SelectRequest>,
) -> Json<ViewSnapshot> {
    Json(state.views.select(&user.uid, field, req.index).await)
}

async fn enter(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(field): Path<FieldKind>,
    Json(req): Json<TextRequest>,
) -> Json<ViewSnapshot> {
    Json(state.views.enter(&user.uid, field, &req.text).await)
}

async fn dismiss(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(field): Path<FieldKind>,
) -> Json<ViewSnapshot> {
    Json(state.views.dismiss(&user.uid, field).await)
}
