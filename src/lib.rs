// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OnTheWay: ride booking backend
//!
//! This crate hosts the ride-booking flow behind a JSON API: role-split
//! registration and login, map-based pickup/destination/waypoint selection
//! with live routes, booking persistence, ride history, and rider location
//! tracking. Identity and documents live in Firebase; geocoding and routing
//! use Nominatim and OSRM.

pub mod config;
pub mod db;
pub mod error;
pub mod map;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod view;

use std::sync::Arc;

use config::Config;
use db::RideStore;
use services::{
    AccountService, AddressResolver, BookingService, HistoryService, IdentityProvider,
    RoutePlanner, TripTracker,
};
use view::ViewRegistry;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RideStore>,
    pub accounts: AccountService,
    pub resolver: AddressResolver,
    pub planner: RoutePlanner,
    pub bookings: BookingService,
    pub history: HistoryService,
    pub views: ViewRegistry,
    pub tracker: TripTracker,
}

impl AppState {
    /// Wire every service over the given backends.
    pub fn new(
        config: Config,
        store: Arc<dyn RideStore>,
        identity: Arc<dyn IdentityProvider>,
        resolver: AddressResolver,
        planner: RoutePlanner,
    ) -> Self {
        let views = ViewRegistry::new(
            resolver.clone(),
            planner.clone(),
            config.autocomplete_debounce,
        );
        let tracker = TripTracker::new(store.clone(), views.clone());

        Self {
            accounts: AccountService::new(identity, store.clone()),
            bookings: BookingService::new(store.clone()),
            history: HistoryService::new(store.clone()),
            config,
            store,
            resolver,
            planner,
            views,
            tracker,
        }
    }
}
