// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.
//!
//! Each persisted record has a domain type and a `*Document` type with the
//! stored field names. Documents are decoded into domain types at the
//! storage boundary; records that do not conform are rejected there.

pub mod booking;
pub mod location;
pub mod notification;
pub mod route;
pub mod user;

pub use booking::{Booking, BookingDocument, NewBooking};
pub use location::{Bounds, LatLon, RiderLocation, RiderLocationDocument};
pub use notification::{Notification, NotificationDocument};
pub use route::RouteCandidate;
pub use user::{Role, User, UserDocument};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::{format_utc_rfc3339, parse_stored_timestamp};

/// A stored document failed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error("unreadable timestamp `{0}`")]
    BadTimestamp(String),

    #[error("invalid passenger count `{0}`")]
    BadPassengerCount(String),
}

/// Timestamp as found in stored documents.
///
/// Firestore timestamps and RFC3339 strings arrive as text; older records
/// carry locale strings or exported `{seconds, nanoseconds}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    Text(String),
    Parts {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

impl StoredTimestamp {
    /// Canonical form for new writes.
    pub fn from_utc(date: DateTime<Utc>) -> Self {
        StoredTimestamp::Text(format_utc_rfc3339(date))
    }

    pub fn decode(&self) -> Result<DateTime<Utc>, DecodeError> {
        match self {
            StoredTimestamp::Text(raw) => {
                parse_stored_timestamp(raw).ok_or_else(|| DecodeError::BadTimestamp(raw.clone()))
            }
            StoredTimestamp::Parts {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .ok_or_else(|| DecodeError::BadTimestamp(format!("{}s", seconds))),
        }
    }
}
