// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecodeError, StoredTimestamp};

/// A persisted ride booking. Never updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Document ID
    pub id: String,
    /// Owner uid
    pub user_id: String,
    pub email: String,
    /// Free-text pickup address
    pub pickup: String,
    /// Free-text destination address
    pub destination: String,
    /// Optional intermediate stop
    pub waypoint: Option<String>,
    pub passengers: u32,
    /// When the booking was submitted
    pub timestamp: DateTime<Utc>,
}

/// A booking about to be written (no document ID yet).
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub email: String,
    pub pickup: String,
    pub destination: String,
    pub waypoint: Option<String>,
    pub passengers: u32,
    pub timestamp: DateTime<Utc>,
}

impl NewBooking {
    pub fn to_document(&self) -> BookingDocument {
        BookingDocument {
            user_id: self.user_id.clone(),
            email: Some(self.email.clone()),
            pickup: self.pickup.clone(),
            destination: self.destination.clone(),
            waypoint: self.waypoint.clone(),
            passengers: PassengerCount::Number(self.passengers),
            timestamp: Some(StoredTimestamp::from_utc(self.timestamp)),
        }
    }
}

impl Booking {
    /// Decode a stored `bookings/{id}` document.
    pub fn from_document(id: &str, doc: BookingDocument) -> Result<Self, DecodeError> {
        let timestamp = doc
            .timestamp
            .as_ref()
            .ok_or(DecodeError::MissingField("timestamp"))?
            .decode()?;

        Ok(Self {
            id: id.to_string(),
            user_id: doc.user_id,
            email: doc.email.unwrap_or_default(),
            pickup: doc.pickup,
            destination: doc.destination,
            waypoint: doc.waypoint.filter(|w| !w.trim().is_empty()),
            passengers: doc.passengers.decode()?,
            timestamp,
        })
    }
}

/// Stored shape of `bookings/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDocument {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub pickup: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoint: Option<String>,
    #[serde(default)]
    pub passengers: PassengerCount,
    #[serde(default)]
    pub timestamp: Option<StoredTimestamp>,
}

/// Passenger count: a number, or the raw form-field string older clients wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassengerCount {
    Number(u32),
    Text(String),
}

impl Default for PassengerCount {
    fn default() -> Self {
        PassengerCount::Number(1)
    }
}

impl PassengerCount {
    pub fn decode(&self) -> Result<u32, DecodeError> {
        match self {
            PassengerCount::Number(n) => Ok(*n),
            PassengerCount::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| DecodeError::BadPassengerCount(s.clone())),
        }
    }
}
