// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live trip tracking.
//!
//! A trip is a spawned task consuming a channel of device positions. Each
//! position moves the vehicle marker and overwrites the rider's location
//! record. Write failures are logged and never end the trip.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::RideStore;
use crate::error::AppError;
use crate::models::{LatLon, RiderLocation};
use crate::view::ViewRegistry;

pub const LOCATION_NOT_SET: &str = "Current location not set.";

/// Positions buffered per trip before `push` waits.
const POSITION_BUFFER: usize = 32;

struct Trip {
    positions: mpsc::Sender<LatLon>,
    task: JoinHandle<()>,
}

/// Owns every running trip. Dropping the tracker aborts them all.
pub struct TripTracker {
    store: Arc<dyn RideStore>,
    views: ViewRegistry,
    trips: DashMap<String, Trip>,
}

impl TripTracker {
    pub fn new(store: Arc<dyn RideStore>, views: ViewRegistry) -> Self {
        Self {
            store,
            views,
            trips: DashMap::new(),
        }
    }

    /// Start (or restart) tracking for `rider_id`.
    pub async fn start(&self, rider_id: &str) -> Result<(), AppError> {
        if !self.views.start_vehicle(rider_id).await {
            return Err(AppError::Validation(LOCATION_NOT_SET.to_string()));
        }

        let (tx, rx) = mpsc::channel(POSITION_BUFFER);
        let task = tokio::spawn(run_trip(
            rider_id.to_string(),
            rx,
            self.store.clone(),
            self.views.clone(),
        ));

        if let Some(previous) = self.trips.insert(rider_id.to_string(), Trip { positions: tx, task }) {
            previous.task.abort();
            tracing::debug!(rider_id, "Replaced running trip");
        }
        tracing::info!(rider_id, "Trip started");
        Ok(())
    }

    /// Feed a device position into the rider's running trip.
    pub async fn push(&self, rider_id: &str, at: LatLon) -> Result<(), AppError> {
        if !at.is_valid() {
            return Err(AppError::Validation(format!(
                "Invalid coordinate: {}, {}",
                at.lat, at.lon
            )));
        }

        // Clone the sender so the map shard is not held across the await.
        let sender = self
            .trips
            .get(rider_id)
            .map(|trip| trip.positions.clone())
            .ok_or_else(|| AppError::BadRequest("No trip in progress".to_string()))?;

        sender
            .send(at)
            .await
            .map_err(|_| AppError::BadRequest("Trip has ended".to_string()))
    }

    /// Stop tracking. Returns false if no trip was running.
    pub fn stop(&self, rider_id: &str) -> bool {
        match self.trips.remove(rider_id) {
            Some((_, trip)) => {
                trip.task.abort();
                tracing::info!(rider_id, "Trip stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_tracking(&self, rider_id: &str) -> bool {
        self.trips.contains_key(rider_id)
    }

    /// Last stored position for a rider.
    pub async fn latest(&self, rider_id: &str) -> Result<RiderLocation, AppError> {
        self.store
            .get_rider_location(rider_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location for rider {}", rider_id)))
    }
}

impl Drop for TripTracker {
    fn drop(&mut self) {
        for trip in self.trips.iter() {
            trip.task.abort();
        }
    }
}

async fn run_trip(
    rider_id: String,
    mut positions: mpsc::Receiver<LatLon>,
    store: Arc<dyn RideStore>,
    views: ViewRegistry,
) {
    while let Some(at) = positions.recv().await {
        views.move_vehicle(&rider_id, at).await;
        record_position(store.as_ref(), &rider_id, at).await;
    }
    tracing::debug!(rider_id = %rider_id, "Position channel closed");
}

/// Overwrite the rider's location, creating the record on first use.
pub async fn record_position(store: &dyn RideStore, rider_id: &str, at: LatLon) {
    let location = RiderLocation::new(rider_id, at, Utc::now());

    match store.update_rider_location(&location).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            if let Err(e) = store.create_rider_location(&location).await {
                tracing::warn!(rider_id, error = %e, "Failed to create rider location");
            }
        }
        Err(e) => tracing::warn!(rider_id, error = %e, "Failed to update rider location"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::services::geocoding::{Geocoder, Place};
    use crate::services::routing::RouteProvider;
    use crate::services::{AddressResolver, RoutePlanner};
    use crate::models::RouteCandidate;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Offline;

    #[async_trait]
    impl Geocoder for Offline {
        async fn search(&self, _q: &str, _l: u32) -> Result<Vec<Place>, AppError> {
            Ok(Vec::new())
        }
        async fn reverse(&self, _at: LatLon) -> Result<Option<String>, AppError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl RouteProvider for Offline {
        async fn route(&self, _stops: &[LatLon]) -> Result<Vec<RouteCandidate>, AppError> {
            Ok(Vec::new())
        }
    }

    fn setup() -> (TripTracker, ViewRegistry, MemoryStore) {
        let store = MemoryStore::new();
        let views = ViewRegistry::new(
            AddressResolver::new(Arc::new(Offline)),
            RoutePlanner::new(Arc::new(Offline)),
            Duration::from_millis(1),
        );
        let tracker = TripTracker::new(Arc::new(store.clone()), views.clone());
        (tracker, views, store)
    }

    async fn eventually<F: Fn() -> bool>(check: F) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_start_requires_pickup() {
        let (tracker, _, _) = setup();
        let err = tracker.start("r1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == LOCATION_NOT_SET));
        assert!(!tracker.is_tracking("r1"));
    }

    #[tokio::test]
    async fn test_positions_create_then_update_location() {
        let (tracker, views, store) = setup();
        views.init("r1", LatLon::new(37.0, -122.0)).await;
        tracker.start("r1").await.unwrap();

        tracker.push("r1", LatLon::new(37.1, -122.1)).await.unwrap();
        tracker.push("r1", LatLon::new(37.2, -122.2)).await.unwrap();

        let store_ref = store.clone();
        assert!(
            eventually(move || {
                futures_util::FutureExt::now_or_never(store_ref.get_rider_location("r1"))
                    .and_then(|r| r.ok().flatten())
                    .map(|loc| loc.latitude == 37.2)
                    .unwrap_or(false)
            })
            .await
        );
        assert_eq!(store.count(collections::RIDER_LOCATIONS), 1);

        let snap = views.snapshot("r1").await;
        let vehicle = snap
            .scene
            .markers
            .iter()
            .find(|m| m.kind == crate::map::MarkerKind::Vehicle)
            .unwrap();
        assert_eq!(vehicle.position, LatLon::new(37.2, -122.2));
    }

    #[tokio::test]
    async fn test_write_failures_do_not_stop_trip() {
        let (tracker, views, store) = setup();
        views.init("r1", LatLon::new(1.0, 1.0)).await;
        tracker.start("r1").await.unwrap();

        store.set_fail_writes(true);
        tracker.push("r1", LatLon::new(1.1, 1.1)).await.unwrap();
        store.set_fail_writes(false);
        tracker.push("r1", LatLon::new(1.2, 1.2)).await.unwrap();

        let probe = store.clone();
        assert!(eventually(move || probe.count(collections::RIDER_LOCATIONS) == 1).await);
        assert!(tracker.is_tracking("r1"));
    }

    #[tokio::test]
    async fn test_stop_ends_trip() {
        let (tracker, views, _) = setup();
        views.init("r1", LatLon::new(1.0, 1.0)).await;
        tracker.start("r1").await.unwrap();
        // Restarting replaces the loop rather than adding a second one.
        tracker.start("r1").await.unwrap();

        assert!(tracker.stop("r1"));
        assert!(!tracker.stop("r1"));
        assert!(tracker.push("r1", LatLon::new(1.0, 1.0)).await.is_err());
    }
}
