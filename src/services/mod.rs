// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod autocomplete;
pub mod booking;
pub mod geocoding;
pub mod history;
pub mod identity;
pub mod routing;
pub mod tracking;

pub use account::{AccountService, GateDecision, Surface};
pub use autocomplete::{AutocompleteField, FieldKind};
pub use booking::{BookingForm, BookingService};
pub use geocoding::{AddressResolver, Geocoder, NominatimClient, Place};
pub use history::HistoryService;
pub use identity::{FirebaseAuthClient, IdentityProvider, MemoryIdentityProvider};
pub use routing::{OsrmClient, RouteProvider, RoutePlanner};
pub use tracking::TripTracker;
