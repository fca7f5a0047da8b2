// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: profile, role gate, bookings, ride history.

use crate::error::{AppError, Result};
use crate::middleware::auth::cleared_session_cookie;
use crate::middleware::{AuthUser, MaybeUser};
use crate::models::{RiderLocation, Role};
use crate::services::booking::{BookingForm, LOGIN_TO_BOOK};
use crate::services::history::RideHistoryView;
use crate::services::{GateDecision, Surface};
use crate::view::ViewSnapshot;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/rides", get(get_rides))
        .route("/api/riders/{id}/location", get(get_rider_location))
}

/// API routes where the session is optional.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/gate/{role}", get(gate))
        .route("/api/bookings", post(create_booking))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Get current user profile (welcome banner).
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.accounts.profile(&user.uid).await?;

    Ok(Json(UserResponse {
        name: profile.display_name(),
        uid: profile.uid,
        email: profile.email,
        role: profile.role,
    }))
}

// ─── Role Gate ───────────────────────────────────────────────

/// Check the session against a dashboard. A signed-out decision clears the cookie.
async fn gate(
    State(state): State<Arc<AppState>>,
    Path(role): Path<Role>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<GateDecision>)> {
    let decision = state
        .accounts
        .gate(Surface::for_role(role), user.as_ref().map(|u| u.uid.as_str()))
        .await?;

    let jar = match (&decision, &user) {
        (GateDecision::SignedOut { .. }, Some(user)) => {
            state.tracker.stop(&user.uid);
            state.views.remove(&user.uid);
            jar.add(cleared_session_cookie())
        }
        _ => jar,
    };

    Ok((jar, Json(decision)))
}

// ─── Bookings ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct BookingResponse {
    pub booking_id: String,
    pub message: String,
    /// The view after the form was cleared
    pub view: ViewSnapshot,
}

/// Submit a booking. Without a session nothing is written, whatever the body.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    body: std::result::Result<Json<BookingForm>, JsonRejection>,
) -> Result<Json<BookingResponse>> {
    let form = match (&user, body) {
        (None, _) => return Err(AppError::LoginRequired(LOGIN_TO_BOOK.to_string())),
        (Some(_), Ok(Json(form))) => form,
        (Some(_), Err(rejection)) => return Err(AppError::BadRequest(rejection.body_text())),
    };

    match state.bookings.submit(user.as_ref(), form).await {
        Ok(confirmation) => {
            // submit() only succeeds with a session
            let uid = user.map(|u| u.uid).unwrap_or_default();
            let view = state
                .views
                .booking_completed(&uid, &confirmation.message)
                .await;
            Ok(Json(BookingResponse {
                booking_id: confirmation.booking_id,
                message: confirmation.message,
                view,
            }))
        }
        Err(e) => {
            if let (Some(user), AppError::Validation(msg) | AppError::Unavailable(msg)) = (&user, &e)
            {
                state.views.booking_failed(&user.uid, msg).await;
            }
            Err(e)
        }
    }
}

// ─── Ride History ────────────────────────────────────────────

async fn get_rides(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RideHistoryView>> {
    Ok(Json(state.history.list(&user.uid).await?))
}

// ─── Rider Location ──────────────────────────────────────────

async fn get_rider_location(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<String>,
) -> Result<Json<RiderLocation>> {
    Ok(Json(state.tracker.latest(&rider_id).await?))
}
