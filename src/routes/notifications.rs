// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rider notifications: one-shot list and a server-sent live query.

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Notification;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

pub const NO_NOTIFICATIONS: &str = "No new notifications.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/stream", get(stream_notifications))
}

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Vec<Notification>> for NotificationsResponse {
    fn from(notifications: Vec<Notification>) -> Self {
        let message = notifications
            .is_empty()
            .then(|| NO_NOTIFICATIONS.to_string());
        Self {
            notifications,
            message,
        }
    }
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NotificationsResponse>> {
    let notifications = state.store.notifications_for_rider(&user.uid).await?;
    Ok(Json(notifications.into()))
}

/// Each event carries the full current list.
async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(uid = %user.uid, "Notification stream opened");

    let events = state
        .store
        .watch_notifications(&user.uid)
        .map(|snapshot| {
            let event = match snapshot {
                Ok(notifications) => Event::default()
                    .event("notifications")
                    .json_data(NotificationsResponse::from(notifications))
                    .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
                Err(e) => {
                    tracing::warn!(error = %e, "Notification live query failed");
                    Event::default().event("error").data(e.to_string())
                }
            };
            Ok::<_, Infallible>(event)
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}
