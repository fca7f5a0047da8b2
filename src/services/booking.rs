// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking form submission.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::db::RideStore;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::NewBooking;

pub const LOGIN_TO_BOOK: &str = "Please log in to book a ride.";
pub const BOOKING_SUCCESSFUL: &str = "Booking successful!";
pub const BOOKING_FAILED: &str = "Failed to book the ride. Please try again.";

/// Submitted booking form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookingForm {
    #[validate(length(min = 1, message = "Please enter both pickup and destination."))]
    pub pickup: String,
    #[validate(length(min = 1, message = "Please enter both pickup and destination."))]
    pub destination: String,
    #[serde(default)]
    pub waypoint: Option<String>,
    #[validate(range(min = 1, max = 8, message = "Passengers must be between 1 and 8."))]
    #[serde(deserialize_with = "passenger_field")]
    pub passengers: i64,
}

/// The form's passenger input arrives as a number or as the field's text.
#[derive(Deserialize)]
#[serde(untagged)]
enum PassengerField {
    Number(i64),
    Text(String),
}

/// Text that is not a whole number becomes 0 and fails the range check.
fn passenger_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match PassengerField::deserialize(deserializer)? {
        PassengerField::Number(n) => n,
        PassengerField::Text(s) => s.trim().parse().unwrap_or(0),
    })
}

impl BookingForm {
    fn normalized(self) -> Self {
        Self {
            pickup: self.pickup.trim().to_string(),
            destination: self.destination.trim().to_string(),
            waypoint: self
                .waypoint
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty()),
            passengers: self.passengers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub message: String,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn RideStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a booking for the signed-in user.
    ///
    /// Without a session nothing is written. Storage failures are logged and
    /// reported with a retry message.
    pub async fn submit(
        &self,
        user: Option<&AuthUser>,
        form: BookingForm,
    ) -> Result<BookingConfirmation, AppError> {
        let Some(user) = user else {
            return Err(AppError::LoginRequired(LOGIN_TO_BOOK.to_string()));
        };

        let form = form.normalized();
        form.validate()?;

        let booking = NewBooking {
            user_id: user.uid.clone(),
            email: user.email.clone(),
            pickup: form.pickup,
            destination: form.destination,
            waypoint: form.waypoint,
            // Range-checked above
            passengers: form.passengers as u32,
            timestamp: Utc::now(),
        };

        match self.store.add_booking(&booking).await {
            Ok(booking_id) => {
                tracing::info!(uid = %user.uid, booking_id = %booking_id, "Ride booked");
                Ok(BookingConfirmation {
                    booking_id,
                    message: BOOKING_SUCCESSFUL.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(uid = %user.uid, error = %e, "Failed to save booking");
                Err(AppError::Unavailable(BOOKING_FAILED.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::models::Role;

    fn passenger() -> AuthUser {
        AuthUser {
            uid: "u1".to_string(),
            role: Role::Passenger,
            email: "u1@example.com".to_string(),
        }
    }

    fn form(passengers: i64) -> BookingForm {
        BookingForm {
            pickup: " 1 Main St ".to_string(),
            destination: "2 Oak Ave".to_string(),
            waypoint: Some("  ".to_string()),
            passengers,
        }
    }

    fn setup() -> (BookingService, MemoryStore) {
        let store = MemoryStore::new();
        (BookingService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_unauthenticated_booking_never_persists() {
        let (service, store) = setup();
        for passengers in [0, 1, 8, 42] {
            let err = service.submit(None, form(passengers)).await.unwrap_err();
            assert!(matches!(err, AppError::LoginRequired(ref m) if m == LOGIN_TO_BOOK));
        }
        assert_eq!(store.count(collections::BOOKINGS), 0);
    }

    #[test]
    fn test_passengers_accept_number_or_text() {
        let parse = |passengers: serde_json::Value| {
            serde_json::from_value::<BookingForm>(serde_json::json!({
                "pickup": "A",
                "destination": "B",
                "passengers": passengers,
            }))
            .unwrap()
            .passengers
        };
        assert_eq!(parse(serde_json::json!(3)), 3);
        assert_eq!(parse(serde_json::json!("2")), 2);
        assert_eq!(parse(serde_json::json!(" 4 ")), 4);
        assert_eq!(parse(serde_json::json!("")), 0);
        assert_eq!(parse(serde_json::json!("two")), 0);
    }

    #[tokio::test]
    async fn test_successful_booking() {
        let (service, store) = setup();
        let user = passenger();
        let ok = service.submit(Some(&user), form(3)).await.unwrap();
        assert_eq!(ok.message, BOOKING_SUCCESSFUL);

        let saved = store.bookings_for_user("u1").await.unwrap().bookings;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].pickup, "1 Main St");
        assert_eq!(saved[0].waypoint, None);
        assert_eq!(saved[0].passengers, 3);
        assert_eq!(saved[0].id, ok.booking_id);
    }

    #[tokio::test]
    async fn test_validation_rejects_without_write() {
        let (service, store) = setup();
        let user = passenger();

        for passengers in [0, 9, -1] {
            let err = service.submit(Some(&user), form(passengers)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let mut blank = form(1);
        blank.destination = "   ".to_string();
        assert!(matches!(
            service.submit(Some(&user), blank).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(store.count(collections::BOOKINGS), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_message() {
        let (service, store) = setup();
        store.set_fail_writes(true);
        let user = passenger();
        let err = service.submit(Some(&user), form(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(ref m) if m == BOOKING_FAILED));
    }
}
