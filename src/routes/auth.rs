// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, password reset and logout routes.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{cleared_session_cookie, create_jwt, session_cookie};
use crate::middleware::MaybeUser;
use crate::models::Role;
use crate::services::account::{
    FlowOutcome, LoginForm, PasswordResetForm, RegisterForm, LOGGED_OUT,
};
use crate::services::Surface;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/{role}/register", post(register))
        .route("/auth/{role}/login", post(login))
        .route("/auth/password-reset", post(password_reset))
}

/// Routes that read the session if there is one.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

/// Successful login response. The session also goes out as a cookie.
#[derive(Serialize)]
pub struct LoginResponse {
    pub uid: String,
    pub name: String,
    pub role: Role,
    pub redirect: String,
    pub token: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Path(role): Path<Role>,
    Json(form): Json<RegisterForm>,
) -> Result<Json<FlowOutcome>> {
    let outcome = state
        .accounts
        .register(Surface::for_role(role), form)
        .await?;
    Ok(Json(outcome))
}

/// Log in on one surface. A role mismatch also clears any existing session.
async fn login(
    State(state): State<Arc<AppState>>,
    Path(role): Path<Role>,
    jar: CookieJar,
    Json(form): Json<LoginForm>,
) -> (CookieJar, Response) {
    let surface = Surface::for_role(role);

    let success = match state.accounts.login(surface, form).await {
        Ok(success) => success,
        Err(e @ AppError::AccessDenied { .. }) => {
            return (jar.add(cleared_session_cookie()), e.into_response());
        }
        Err(e) => return (jar, e.into_response()),
    };

    let token = match create_jwt(&success.user, &state.config.jwt_signing_key) {
        Ok(token) => token,
        Err(e) => return (jar, AppError::Internal(e).into_response()),
    };

    let body = LoginResponse {
        uid: success.user.uid.clone(),
        name: success.user.display_name(),
        role: success.user.role,
        redirect: success.redirect.to_string(),
        token: token.clone(),
    };
    (jar.add(session_cookie(token)), Json(body).into_response())
}

async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(form): Json<PasswordResetForm>,
) -> Result<Json<FlowOutcome>> {
    Ok(Json(state.accounts.reset_password(form).await?))
}

/// Sign out locally: drop the view, stop any trip, clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    jar: CookieJar,
) -> (CookieJar, Json<FlowOutcome>) {
    if let Some(user) = user {
        state.tracker.stop(&user.uid);
        state.views.remove(&user.uid);
        tracing::info!(uid = %user.uid, "User logged out");
    }

    (
        jar.add(cleared_session_cookie()),
        Json(FlowOutcome {
            message: LOGGED_OUT.to_string(),
            redirect: Some(Surface::PASSENGER.login_page.to_string()),
        }),
    )
}
