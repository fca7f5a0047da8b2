//! Rider notification model (read-only here; created by an admin process).

use serde::{Deserialize, Serialize};

/// A notification addressed to one rider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub rider_id: String,
    pub message: String,
}

impl Notification {
    pub fn from_document(id: &str, doc: NotificationDocument) -> Self {
        Self {
            id: id.to_string(),
            rider_id: doc.rider_id,
            message: doc.message,
        }
    }
}

/// Stored shape of `notifications/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDocument {
    pub rider_id: String,
    #[serde(default)]
    pub message: String,
}
