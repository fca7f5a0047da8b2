// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride history for the signed-in user.

use std::sync::Arc;

use serde::Serialize;

use crate::db::RideStore;
use crate::error::AppError;
use crate::models::Booking;

pub const NO_BOOKINGS: &str = "No bookings found.";

/// One rendered booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideEntry {
    pub id: String,
    pub pickup: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoint: Option<String>,
    pub passengers: u32,
    /// `YYYY-MM-DD` (UTC)
    pub date: String,
    /// `HH:MM:SS` (UTC)
    pub time: String,
}

impl From<Booking> for RideEntry {
    fn from(b: Booking) -> Self {
        RideEntry {
            date: b.timestamp.format("%Y-%m-%d").to_string(),
            time: b.timestamp.format("%H:%M:%S").to_string(),
            id: b.id,
            pickup: b.pickup,
            destination: b.destination,
            waypoint: b.waypoint,
            passengers: b.passengers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideHistoryView {
    pub entries: Vec<RideEntry>,
    /// Stored records that could not be decoded
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn RideStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Every booking owned by `uid`, in storage order.
    pub async fn list(&self, uid: &str) -> Result<RideHistoryView, AppError> {
        let query = self.store.bookings_for_user(uid).await?;
        if query.rejected > 0 {
            tracing::warn!(uid, skipped = query.rejected, "Some bookings could not be shown");
        }

        let entries: Vec<RideEntry> = query.bookings.into_iter().map(RideEntry::from).collect();
        let message = entries.is_empty().then(|| NO_BOOKINGS.to_string());

        Ok(RideHistoryView {
            entries,
            skipped: query.rejected,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::models::NewBooking;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn booking(uid: &str, pickup: &str) -> NewBooking {
        NewBooking {
            user_id: uid.to_string(),
            email: format!("{}@example.com", uid),
            pickup: pickup.to_string(),
            destination: "Airport".to_string(),
            waypoint: None,
            passengers: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 10, 18, 9, 5, 7).unwrap(),
        }
    }

    fn setup() -> (HistoryService, MemoryStore) {
        let store = MemoryStore::new();
        (HistoryService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_empty_history_message() {
        let (service, _) = setup();
        let view = service.list("nobody").await.unwrap();
        assert!(view.entries.is_empty());
        assert_eq!(view.message.as_deref(), Some(NO_BOOKINGS));
    }

    #[tokio::test]
    async fn test_lists_only_own_bookings() {
        let (service, store) = setup();
        for pickup in ["A", "B", "C"] {
            store.add_booking(&booking("u1", pickup)).await.unwrap();
        }
        store.add_booking(&booking("u2", "Z")).await.unwrap();

        let view = service.list("u1").await.unwrap();
        assert_eq!(view.entries.len(), 3);
        assert!(view.message.is_none());

        let mut pickups: Vec<_> = view.entries.iter().map(|e| e.pickup.as_str()).collect();
        pickups.sort();
        assert_eq!(pickups, ["A", "B", "C"]);

        assert_eq!(view.entries[0].date, "2024-10-18");
        assert_eq!(view.entries[0].time, "09:05:07");
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let (service, store) = setup();
        store.add_booking(&booking("u1", "Good")).await.unwrap();
        store.insert_raw(
            collections::BOOKINGS,
            "legacy",
            json!({
                "userId": "u1",
                "pickup": "Old",
                "destination": "Town",
                "passengers": "2",
                "timestamp": "10/18/2024, 3:04:05 PM"
            }),
        );
        store.insert_raw(
            collections::BOOKINGS,
            "broken",
            json!({ "userId": "u1", "pickup": "X", "destination": "Y", "timestamp": "yesterday" }),
        );

        let view = service.list("u1").await.unwrap();
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.skipped, 1);

        let legacy = view.entries.iter().find(|e| e.id == "legacy").unwrap();
        assert_eq!(legacy.passengers, 2);
        assert_eq!(legacy.time, "15:04:05");
    }
}
