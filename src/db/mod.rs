//! Database layer: the document store boundary.
//!
//! `RideStore` is the typed view of the hosted document database. Records
//! are decoded and validated here; callers only ever see domain types.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::AppError;
use crate::models::{Booking, NewBooking, Notification, RiderLocation, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const BOOKINGS: &str = "bookings";
    /// Latest rider position (keyed by rider uid)
    pub const RIDER_LOCATIONS: &str = "riderLocations";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Live query over a rider's notifications. Each item is a full snapshot.
pub type NotificationStream = BoxStream<'static, Result<Vec<Notification>, AppError>>;

/// Result of a bookings query.
#[derive(Debug, Default)]
pub struct BookingQuery {
    /// Records that decoded cleanly, in storage order
    pub bookings: Vec<Booking>,
    /// Records skipped because they did not conform to the schema
    pub rejected: usize,
}

/// Typed operations on the hosted document database.
#[async_trait]
pub trait RideStore: Send + Sync {
    /// Read a user profile. Documents without a valid role are treated as absent.
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;

    /// Write a user profile at `users/{uid}`.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Persist a booking under a generated ID, returning the ID.
    async fn add_booking(&self, booking: &NewBooking) -> Result<String, AppError>;

    /// All bookings owned by `uid` (no ordering, no limit).
    async fn bookings_for_user(&self, uid: &str) -> Result<BookingQuery, AppError>;

    /// Overwrite an existing rider location. Returns `NotFound` if there is none.
    async fn update_rider_location(&self, location: &RiderLocation) -> Result<(), AppError>;

    /// Create (or replace) a rider location.
    async fn create_rider_location(&self, location: &RiderLocation) -> Result<(), AppError>;

    async fn get_rider_location(&self, rider_id: &str) -> Result<Option<RiderLocation>, AppError>;

    async fn notifications_for_rider(&self, rider_id: &str)
        -> Result<Vec<Notification>, AppError>;

    /// Subscribe to a rider's notifications. The first item is the current snapshot.
    fn watch_notifications(&self, rider_id: &str) -> NotificationStream;
}
