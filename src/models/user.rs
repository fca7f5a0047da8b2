//! User model for storage and API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecodeError, StoredTimestamp};

/// Which surface a user belongs to. Set at registration, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Passenger,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Passenger => "passenger",
            Role::Rider => "rider",
        }
    }

    /// Capitalized label used in user-facing messages.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Passenger => "Passenger",
            Role::Rider => "Rider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passenger" => Ok(Role::Passenger),
            "rider" => Ok(Role::Rider),
            other => Err(DecodeError::UnknownRole(other.to_string())),
        }
    }
}

/// User profile (document ID is the identity provider's uid).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name for the welcome banner, falling back to the email's local part.
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        match self.email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }

    /// Decode a stored `users/{uid}` document.
    pub fn from_document(uid: &str, doc: UserDocument) -> Result<Self, DecodeError> {
        let role = doc
            .role
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or(DecodeError::MissingField("role"))?
            .parse()?;

        let created_at = doc.created_at.as_ref().map(|ts| ts.decode()).transpose()?;

        Ok(Self {
            uid: uid.to_string(),
            name: doc.name.unwrap_or_default(),
            email: doc.email.unwrap_or_default(),
            role,
            created_at,
        })
    }

    pub fn to_document(&self) -> UserDocument {
        UserDocument {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            role: Some(self.role.as_str().to_string()),
            created_at: self.created_at.map(StoredTimestamp::from_utc),
        }
    }
}

/// Stored shape of `users/{uid}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<StoredTimestamp>,
}
