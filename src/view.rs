// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user booking view state.
//!
//! Each signed-in user gets one `BookingView` (map, field texts, last
//! notice) behind its own lock, plus one `AutocompleteField` per input.
//! Autocomplete waits and lookups run outside the view lock so a newer
//! keystroke can supersede an older one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::map::{MapController, MapScene, SceneRecorder};
use crate::models::LatLon;
use crate::services::autocomplete::{AutocompleteField, FieldKind, FieldState, InputOutcome};
use crate::services::geocoding::Place;
use crate::services::{AddressResolver, RoutePlanner};

pub const NO_ROUTE_FOUND: &str = "No route found.";
pub const ROUTE_FETCH_FAILED: &str = "Error fetching route. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Inline message shown under the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Text currently in the form inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldTexts {
    pub pickup: String,
    pub destination: String,
    pub waypoint: String,
}

impl FieldTexts {
    fn get_mut(&mut self, field: FieldKind) -> &mut String {
        match field {
            FieldKind::Pickup => &mut self.pickup,
            FieldKind::Destination => &mut self.destination,
            FieldKind::Waypoint => &mut self.waypoint,
        }
    }

    fn get(&self, field: FieldKind) -> &str {
        match field {
            FieldKind::Pickup => &self.pickup,
            FieldKind::Destination => &self.destination,
            FieldKind::Waypoint => &self.waypoint,
        }
    }
}

/// Mutable view state for one user.
#[derive(Debug)]
pub struct BookingView {
    pub map: MapController<SceneRecorder>,
    pub texts: FieldTexts,
    pub notice: Option<Notice>,
}

impl Default for BookingView {
    fn default() -> Self {
        Self {
            map: MapController::new(SceneRecorder::new()),
            texts: FieldTexts::default(),
            notice: None,
        }
    }
}

impl BookingView {
    fn apply_place(&mut self, field: FieldKind, place: &Place) {
        let at = place.position();
        match field {
            FieldKind::Pickup => self.map.set_pickup(at),
            FieldKind::Destination => self.map.set_destination(at),
            FieldKind::Waypoint => {
                // The form has a single waypoint input.
                self.map.clear_waypoints();
                self.map.add_waypoint(at);
            }
        }
        *self.texts.get_mut(field) = place.display_name.clone();
    }

    /// Re-plan and redraw the route if both ends are placed.
    async fn reroute(&mut self, planner: &RoutePlanner) {
        let Some(stops) = self.map.route_stops() else {
            return;
        };

        match planner.plan_route(&stops).await {
            Ok(candidates) if candidates.is_empty() => {
                self.map.clear_routes();
                self.notice = Some(Notice::error(NO_ROUTE_FOUND));
            }
            Ok(candidates) => self.map.render_routes(&candidates),
            Err(e) => {
                tracing::warn!(error = %e, stops = stops.len(), "Route planning failed");
                self.notice = Some(Notice::error(ROUTE_FETCH_FAILED));
            }
        }
    }
}

/// Per-field status for the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub field: FieldKind,
    pub text: String,
    #[serde(flatten)]
    pub state: FieldState,
}

/// Serialized view returned by the map endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub scene: MapScene,
    pub fields: Vec<FieldSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// One user's view and autocomplete fields.
pub struct UserView {
    view: Mutex<BookingView>,
    pickup: AutocompleteField,
    destination: AutocompleteField,
    waypoint: AutocompleteField,
}

impl UserView {
    fn new() -> Self {
        Self {
            view: Mutex::new(BookingView::default()),
            pickup: AutocompleteField::new(FieldKind::Pickup),
            destination: AutocompleteField::new(FieldKind::Destination),
            waypoint: AutocompleteField::new(FieldKind::Waypoint),
        }
    }

    fn field(&self, kind: FieldKind) -> &AutocompleteField {
        match kind {
            FieldKind::Pickup => &self.pickup,
            FieldKind::Destination => &self.destination,
            FieldKind::Waypoint => &self.waypoint,
        }
    }

    pub fn view(&self) -> &Mutex<BookingView> {
        &self.view
    }

    async fn snapshot_locked(&self, view: &BookingView) -> ViewSnapshot {
        let mut fields = Vec::with_capacity(FieldKind::ALL.len());
        for kind in FieldKind::ALL {
            fields.push(FieldSnapshot {
                field: kind,
                text: view.texts.get(kind).to_string(),
                state: self.field(kind).state().await,
            });
        }
        ViewSnapshot {
            scene: view.map.surface().scene().clone(),
            fields,
            notice: view.notice.clone(),
        }
    }
}

/// All live booking views, keyed by uid.
#[derive(Clone)]
pub struct ViewRegistry {
    views: Arc<DashMap<String, Arc<UserView>>>,
    resolver: AddressResolver,
    planner: RoutePlanner,
    debounce: Duration,
}

impl ViewRegistry {
    pub fn new(resolver: AddressResolver, planner: RoutePlanner, debounce: Duration) -> Self {
        Self {
            views: Arc::new(DashMap::new()),
            resolver,
            planner,
            debounce,
        }
    }

    /// The user's view, created empty on first use.
    pub fn get(&self, uid: &str) -> Arc<UserView> {
        self.views
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(UserView::new()))
            .clone()
    }

    /// Drop a user's view (on logout).
    pub fn remove(&self, uid: &str) {
        self.views.remove(uid);
    }

    pub async fn snapshot(&self, uid: &str) -> ViewSnapshot {
        let user = self.get(uid);
        let view = user.view.lock().await;
        user.snapshot_locked(&view).await
    }

    /// Initialize the map from the device position and fill the pickup text.
    pub async fn init(&self, uid: &str, at: LatLon) -> ViewSnapshot {
        let address = self.resolver.reverse_geocode(at).await;

        let user = self.get(uid);
        let mut view = user.view.lock().await;
        view.notice = None;
        view.map.init(at);
        view.texts.pickup = address.unwrap_or_else(|| format!("{}, {}", at.lat, at.lon));
        view.reroute(&self.planner).await;
        user.snapshot_locked(&view).await
    }

    /// A keystroke in one of the address fields.
    pub async fn input(&self, uid: &str, field: FieldKind, text: &str) -> InputOutcome {
        let user = self.get(uid);
        *user.view.lock().await.texts.get_mut(field) = text.to_string();

        let outcome = user
            .field(field)
            .input(text, &self.resolver, self.debounce)
            .await;
        tracing::debug!(uid, field = %field, generation = user.field(field).generation(), ?outcome, "Autocomplete input");
        outcome
    }

    /// Pick a displayed suggestion: place its marker and re-route.
    pub async fn select(&self, uid: &str, field: FieldKind, index: usize) -> ViewSnapshot {
        let user = self.get(uid);
        let picked = user.field(field).select(index).await;

        let mut view = user.view.lock().await;
        view.notice = None;
        if let Some(place) = picked {
            view.apply_place(field, &place);
            view.reroute(&self.planner).await;
        }
        user.snapshot_locked(&view).await
    }

    /// Enter pressed in a field: geocode the typed text.
    pub async fn enter(&self, uid: &str, field: FieldKind, text: &str) -> ViewSnapshot {
        let user = self.get(uid);
        let result = user.field(field).enter(text, &self.resolver).await;

        let mut view = user.view.lock().await;
        view.notice = None;
        *view.texts.get_mut(field) = text.to_string();
        match result {
            Ok(place) => {
                view.apply_place(field, &place);
                view.reroute(&self.planner).await;
            }
            Err(message) => view.notice = Some(Notice::error(message)),
        }
        user.snapshot_locked(&view).await
    }

    /// Click outside a field: close its list.
    pub async fn dismiss(&self, uid: &str, field: FieldKind) -> ViewSnapshot {
        let user = self.get(uid);
        user.field(field).dismiss().await;
        let view = user.view.lock().await;
        user.snapshot_locked(&view).await
    }

    /// Successful booking: clear the inputs and redraw the route.
    pub async fn booking_completed(&self, uid: &str, message: &str) -> ViewSnapshot {
        let user = self.get(uid);
        let mut view = user.view.lock().await;
        view.texts = FieldTexts::default();
        view.notice = Some(Notice::success(message));
        view.reroute(&self.planner).await;
        user.snapshot_locked(&view).await
    }

    /// Booking failed: keep the inputs and show the error.
    pub async fn booking_failed(&self, uid: &str, message: &str) -> ViewSnapshot {
        let user = self.get(uid);
        let mut view = user.view.lock().await;
        view.notice = Some(Notice::error(message));
        user.snapshot_locked(&view).await
    }

    /// Place the vehicle on the pickup marker. Returns false without a pickup.
    pub async fn start_vehicle(&self, uid: &str) -> bool {
        let user = self.get(uid);
        let mut view = user.view.lock().await;
        view.map.start_vehicle()
    }

    pub async fn move_vehicle(&self, uid: &str, at: LatLon) {
        let user = self.get(uid);
        user.view.lock().await.map.move_vehicle(at);
    }
}
