// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and role)
//! - Bookings (per-user ride history)
//! - Rider locations (latest position only)
//! - Notifications (read-only, polled live query)

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::db::{collections, BookingQuery, NotificationStream, RideStore};
use crate::error::AppError;
use crate::models::{
    Booking, BookingDocument, NewBooking, Notification, NotificationDocument, RiderLocation,
    RiderLocationDocument, User, UserDocument,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    poll_interval: Duration,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create an offline client. All operations return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how often live queries re-read their collection.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Read one raw document and deserialize it.
    async fn get_doc<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let doc = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        doc.map(|d| {
            firestore::FirestoreDb::deserialize_doc_to::<T>(&d)
                .map_err(|e| AppError::Database(format!("{}/{}: {}", collection, id, e)))
        })
        .transpose()
    }

    /// Equality query returning `(document id, raw document)` pairs.
    async fn query_eq(
        &self,
        collection: &str,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<(String, firestore::FirestoreDocument)>, AppError> {
        let value = value.to_string();
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field(field).eq(value.clone()))
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs
            .into_iter()
            .map(|d| (document_id(&d.name).to_string(), d))
            .collect())
    }

    /// Write (create or replace) a document.
    async fn set_doc<T: serde::Serialize + for<'de> serde::Deserialize<'de> + Sync + Send>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Last path segment of a full document name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[async_trait]
impl RideStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let Some(doc) = self.get_doc::<UserDocument>(collections::USERS, uid).await? else {
            return Ok(None);
        };

        match User::from_document(uid, doc) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(uid, error = %e, "Rejecting malformed user document");
                Ok(None)
            }
        }
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.uid, &user.to_document())
            .await
    }

    // ─── Booking Operations ──────────────────────────────────────

    async fn add_booking(&self, booking: &NewBooking) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set_doc(collections::BOOKINGS, &id, &booking.to_document())
            .await?;
        Ok(id)
    }

    async fn bookings_for_user(&self, uid: &str) -> Result<BookingQuery, AppError> {
        let docs = self.query_eq(collections::BOOKINGS, "userId", uid).await?;

        let mut result = BookingQuery::default();
        for (id, doc) in docs {
            let decoded = firestore::FirestoreDb::deserialize_doc_to::<BookingDocument>(&doc)
                .map_err(|e| e.to_string())
                .and_then(|d| Booking::from_document(&id, d).map_err(|e| e.to_string()));

            match decoded {
                Ok(booking) => result.bookings.push(booking),
                Err(e) => {
                    tracing::warn!(uid, booking_id = %id, error = %e, "Skipping malformed booking");
                    result.rejected += 1;
                }
            }
        }
        Ok(result)
    }

    // ─── Rider Location Operations ───────────────────────────────

    async fn update_rider_location(&self, location: &RiderLocation) -> Result<(), AppError> {
        let existing = self
            .get_doc::<RiderLocationDocument>(collections::RIDER_LOCATIONS, &location.rider_id)
            .await?;
        if existing.is_none() {
            return Err(AppError::NotFound(format!(
                "Location for rider {}",
                location.rider_id
            )));
        }
        self.set_doc(
            collections::RIDER_LOCATIONS,
            &location.rider_id,
            &location.to_document(),
        )
        .await
    }

    async fn create_rider_location(&self, location: &RiderLocation) -> Result<(), AppError> {
        self.set_doc(
            collections::RIDER_LOCATIONS,
            &location.rider_id,
            &location.to_document(),
        )
        .await
    }

    async fn get_rider_location(&self, rider_id: &str) -> Result<Option<RiderLocation>, AppError> {
        let doc = self
            .get_doc::<RiderLocationDocument>(collections::RIDER_LOCATIONS, rider_id)
            .await?;
        doc.map(|d| {
            RiderLocation::from_document(rider_id, d)
                .map_err(|e| AppError::Database(format!("riderLocations/{}: {}", rider_id, e)))
        })
        .transpose()
    }

    // ─── Notification Operations ─────────────────────────────────

    async fn notifications_for_rider(
        &self,
        rider_id: &str,
    ) -> Result<Vec<Notification>, AppError> {
        let docs = self
            .query_eq(collections::NOTIFICATIONS, "riderId", rider_id)
            .await?;

        let mut notifications = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match firestore::FirestoreDb::deserialize_doc_to::<NotificationDocument>(&doc) {
                Ok(d) => notifications.push(Notification::from_document(&id, d)),
                Err(e) => tracing::warn!(rider_id, id = %id, error = %e, "Skipping malformed notification"),
            }
        }
        Ok(notifications)
    }

    fn watch_notifications(&self, rider_id: &str) -> NotificationStream {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let state = PollState {
            db: self.clone(),
            rider_id: rider_id.to_string(),
            last: None,
            interval,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                st.interval.tick().await;
                match st.db.notifications_for_rider(&st.rider_id).await {
                    Ok(snapshot) if st.last.as_ref() == Some(&snapshot) => continue,
                    Ok(snapshot) => {
                        st.last = Some(snapshot.clone());
                        return Some((Ok(snapshot), st));
                    }
                    Err(e) => return Some((Err(e), st)),
                }
            }
        })
        .boxed()
    }
}

/// State carried between polls of a live query.
struct PollState {
    db: FirestoreDb,
    rider_id: String,
    last: Option<Vec<Notification>>,
    interval: tokio::time::Interval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_from_name() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/bookings/abc123"),
            "abc123"
        );
        assert_eq!(document_id("abc"), "abc");
    }

    #[tokio::test]
    async fn test_offline_client_reports_database_error() {
        let db = FirestoreDb::new_mock();
        let err = db.get_user("uid").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
