// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Debounced address suggestions for one input field.
//!
//! Every keystroke bumps the field's generation. A request only gets to
//! display its results if no newer keystroke (or selection/dismissal)
//! happened while it was waiting or in flight.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::geocoding::{AddressResolver, Place};

pub const NO_LOCATIONS_FOUND: &str = "No locations found.";
pub const ENTER_TOO_SHORT: &str = "Please enter at least 3 characters for the location.";
pub const ENTER_NO_MATCH: &str = "No locations found for the entered query.";

/// Booking form fields that offer suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Pickup,
    Destination,
    Waypoint,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Pickup, FieldKind::Destination, FieldKind::Waypoint];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Pickup => "pickup",
            FieldKind::Destination => "destination",
            FieldKind::Waypoint => "waypoint",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(FieldKind::Pickup),
            "destination" => Ok(FieldKind::Destination),
            "waypoint" => Ok(FieldKind::Waypoint),
            other => Err(format!("Unknown field: {}", other)),
        }
    }
}

/// Where the suggestion list currently is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FieldState {
    Idle,
    Debouncing,
    Fetching,
    Displaying {
        suggestions: Vec<Place>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// What happened to one keystroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum InputOutcome {
    /// Text too short; list cleared without a lookup
    Cleared,
    /// A newer keystroke arrived during the debounce wait
    Superseded,
    /// A newer keystroke arrived while the lookup was in flight
    Stale,
    Suggestions {
        suggestions: Vec<Place>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

#[derive(Debug)]
pub struct AutocompleteField {
    kind: FieldKind,
    generation: AtomicU64,
    state: Mutex<FieldState>,
}

impl AutocompleteField {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            generation: AtomicU64::new(0),
            state: Mutex::new(FieldState::Idle),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> FieldState {
        self.state.lock().await.clone()
    }

    /// Handle a keystroke: wait out the debounce, then fetch suggestions.
    pub async fn input(
        &self,
        text: &str,
        resolver: &AddressResolver,
        debounce: Duration,
    ) -> InputOutcome {
        let generation = self.bump();

        if !AddressResolver::is_searchable(text) {
            self.set_if_current(generation, FieldState::Idle).await;
            return InputOutcome::Cleared;
        }

        self.set_if_current(generation, FieldState::Debouncing).await;
        tokio::time::sleep(debounce).await;
        if !self.is_current(generation) {
            return InputOutcome::Superseded;
        }

        self.set_if_current(generation, FieldState::Fetching).await;
        let suggestions = resolver.suggest(text).await;

        let message = suggestions
            .is_empty()
            .then(|| NO_LOCATIONS_FOUND.to_string());
        let displayed = FieldState::Displaying {
            suggestions: suggestions.clone(),
            message: message.clone(),
        };
        if !self.set_if_current(generation, displayed).await {
            tracing::debug!(field = %self.kind, generation, "Dropping stale suggestions");
            return InputOutcome::Stale;
        }

        InputOutcome::Suggestions {
            suggestions,
            message,
        }
    }

    /// Pick a displayed suggestion. Clears the list either way.
    pub async fn select(&self, index: usize) -> Option<Place> {
        self.bump();
        let mut state = self.state.lock().await;
        let picked = match &*state {
            FieldState::Displaying { suggestions, .. } => suggestions.get(index).cloned(),
            _ => None,
        };
        *state = FieldState::Idle;
        picked
    }

    /// Forward geocode the typed text (Enter key). Clears the list either way.
    pub async fn enter(&self, text: &str, resolver: &AddressResolver) -> Result<Place, String> {
        self.bump();
        *self.state.lock().await = FieldState::Idle;

        if !AddressResolver::is_searchable(text) {
            return Err(ENTER_TOO_SHORT.to_string());
        }
        resolver
            .forward_geocode(text)
            .await
            .ok_or_else(|| ENTER_NO_MATCH.to_string())
    }

    /// Close the list without selecting (click outside).
    pub async fn dismiss(&self) {
        self.bump();
        *self.state.lock().await = FieldState::Idle;
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Set the state only if `generation` is still the latest. Returns whether it was.
    async fn set_if_current(&self, generation: u64, next: FieldState) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            return false;
        }
        *state = next;
        true
    }
}
