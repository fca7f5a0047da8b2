// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Documents are kept as JSON values and go through the same document types
//! and decoding as Firestore records, so schema checks behave identically.
//! Used for local development (`BACKEND=memory`) and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::db::{collections, BookingQuery, NotificationStream, RideStore};
use crate::error::AppError;
use crate::models::{
    Booking, BookingDocument, NewBooking, Notification, NotificationDocument, RiderLocation,
    RiderLocationDocument, User, UserDocument,
};

type Collection = DashMap<String, serde_json::Value>;

/// In-memory `RideStore`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: DashMap<&'static str, Collection>,
    /// Bumped on every notification insert
    notification_version: watch::Sender<u64>,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (notification_version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                collections: DashMap::new(),
                notification_version,
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a raw document, bypassing the typed API (e.g. legacy records).
    pub fn insert_raw(&self, collection: &'static str, id: &str, value: serde_json::Value) {
        self.inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), value);
        if collection == collections::NOTIFICATIONS {
            self.inner.notification_version.send_modify(|v| *v += 1);
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Create a notification for a rider (stands in for the admin process).
    pub fn push_notification(&self, rider_id: &str, message: &str) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let doc = NotificationDocument {
            rider_id: rider_id.to_string(),
            message: message.to_string(),
        };
        // Serializing a plain struct of strings cannot fail.
        let value = serde_json::to_value(doc).unwrap_or_default();
        self.insert_raw(collections::NOTIFICATIONS, &id, value);
        id
    }

    fn write<T: Serialize>(
        &self,
        collection: &'static str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(format!(
                "write to {}/{} rejected",
                collection, id
            )));
        }
        let value = serde_json::to_value(doc)
            .map_err(|e| AppError::Database(format!("{}/{}: {}", collection, id, e)))?;
        self.inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    fn read<T: DeserializeOwned>(
        &self,
        collection: &'static str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let Some(col) = self.inner.collections.get(collection) else {
            return Ok(None);
        };
        let Some(value) = col.get(id).map(|v| v.value().clone()) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::Database(format!("{}/{}: {}", collection, id, e)))
    }

    /// Documents whose `field` equals `value`, as `(id, raw)` pairs.
    fn query_eq(
        &self,
        collection: &'static str,
        field: &str,
        value: &str,
    ) -> Vec<(String, serde_json::Value)> {
        let Some(col) = self.inner.collections.get(collection) else {
            return Vec::new();
        };
        col.iter()
            .filter(|entry| entry.value().get(field).and_then(|v| v.as_str()) == Some(value))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn list_notifications(&self, rider_id: &str) -> Vec<Notification> {
        let mut notifications: Vec<Notification> = self
            .query_eq(collections::NOTIFICATIONS, "riderId", rider_id)
            .into_iter()
            .filter_map(|(id, value)| {
                serde_json::from_value::<NotificationDocument>(value)
                    .ok()
                    .map(|d| Notification::from_document(&id, d))
            })
            .collect();
        // DashMap iteration order is arbitrary; keep snapshots comparable.
        notifications.sort_by(|a, b| a.id.cmp(&b.id));
        notifications
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let Some(doc) = self.read::<UserDocument>(collections::USERS, uid)? else {
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
        self.write(collections::USERS, &user.uid, &user.to_document())
    }

    async fn add_booking(&self, booking: &NewBooking) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.write(collections::BOOKINGS, &id, &booking.to_document())?;
        Ok(id)
    }

    async fn bookings_for_user(&self, uid: &str) -> Result<BookingQuery, AppError> {
        let mut result = BookingQuery::default();
        for (id, value) in self.query_eq(collections::BOOKINGS, "userId", uid) {
            let decoded = serde_json::from_value::<BookingDocument>(value)
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

    async fn update_rider_location(&self, location: &RiderLocation) -> Result<(), AppError> {
        let exists = self
            .inner
            .collections
            .get(collections::RIDER_LOCATIONS)
            .map(|c| c.contains_key(&location.rider_id))
            .unwrap_or(false);
        if !exists {
            return Err(AppError::NotFound(format!(
                "Location for rider {}",
                location.rider_id
            )));
        }
        self.write(
            collections::RIDER_LOCATIONS,
            &location.rider_id,
            &location.to_document(),
        )
    }

    async fn create_rider_location(&self, location: &RiderLocation) -> Result<(), AppError> {
        self.write(
            collections::RIDER_LOCATIONS,
            &location.rider_id,
            &location.to_document(),
        )
    }

    async fn get_rider_location(&self, rider_id: &str) -> Result<Option<RiderLocation>, AppError> {
        self.read::<RiderLocationDocument>(collections::RIDER_LOCATIONS, rider_id)?
            .map(|d| {
                RiderLocation::from_document(rider_id, d)
                    .map_err(|e| AppError::Database(format!("riderLocations/{}: {}", rider_id, e)))
            })
            .transpose()
    }

    async fn notifications_for_rider(
        &self,
        rider_id: &str,
    ) -> Result<Vec<Notification>, AppError> {
        Ok(self.list_notifications(rider_id))
    }

    fn watch_notifications(&self, rider_id: &str) -> NotificationStream {
        let state = WatchState {
            store: self.clone(),
            rider_id: rider_id.to_string(),
            changes: self.inner.notification_version.subscribe(),
            last: None,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                if st.last.is_some() && st.changes.changed().await.is_err() {
                    return None;
                }
                st.changes.borrow_and_update();
                let snapshot = st.store.list_notifications(&st.rider_id);
                if st.last.as_ref() == Some(&snapshot) {
                    continue;
                }
                st.last = Some(snapshot.clone());
                return Some((Ok(snapshot), st));
            }
        })
        .boxed()
    }
}

struct WatchState {
    store: MemoryStore,
    rider_id: String,
    changes: watch::Receiver<u64>,
    last: Option<Vec<Notification>>,
}
