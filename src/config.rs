//! Application configuration loaded from environment variables.
//!
//! The Firebase web API key is a public client identifier, not a secret;
//! the JWT signing key is the only real secret.

use std::env;
use std::time::Duration;

/// Which hosted backends to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Firebase Authentication + Cloud Firestore.
    Firebase,
    /// In-process identity and document store (local development).
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Firebase web API key (public)
    pub firebase_api_key: String,
    /// GCP project ID backing Firestore
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Nominatim base URL
    pub nominatim_url: String,
    /// User-Agent sent to Nominatim (required by its usage policy)
    pub geocoder_user_agent: String,
    /// OSRM base URL
    pub osrm_url: String,
    /// OSRM routing profile
    pub osrm_profile: String,
    /// Ask OSRM for alternative routes
    pub route_alternatives: bool,
    /// Autocomplete debounce delay
    pub autocomplete_debounce: Duration,
    /// Poll interval for Firestore-backed live queries
    pub notification_poll: Duration,
    /// Timeout for outbound HTTP calls (none by default)
    pub http_timeout: Option<Duration>,
    /// Identity/document backend
    pub backend: Backend,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend = match env::var("BACKEND").as_deref() {
            Ok("memory") => Backend::Memory,
            Ok("firebase") | Err(_) => Backend::Firebase,
            Ok(_) => return Err(ConfigError::Invalid("BACKEND")),
        };

        let firebase_api_key = match backend {
            Backend::Firebase => env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            Backend::Memory => env::var("FIREBASE_API_KEY").unwrap_or_default(),
        };

        Ok(Self {
            firebase_api_key,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| format!("ontheway/{}", env!("CARGO_PKG_VERSION"))),
            osrm_url: env::var("OSRM_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
            osrm_profile: env::var("OSRM_PROFILE").unwrap_or_else(|_| "driving".to_string()),
            route_alternatives: parse_bool("ROUTE_ALTERNATIVES", true)?,
            autocomplete_debounce: Duration::from_millis(parse_u64("AUTOCOMPLETE_DEBOUNCE_MS")?
                .unwrap_or(300)),
            notification_poll: Duration::from_secs(
                parse_u64("NOTIFICATION_POLL_SECS")?.unwrap_or(5).max(1),
            ),
            http_timeout: parse_u64("HTTP_TIMEOUT_SECS")?.map(Duration::from_secs),
            backend,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests: in-memory backends, short debounce.
    pub fn test_default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            nominatim_url: "http://127.0.0.1:1".to_string(),
            geocoder_user_agent: "ontheway-test".to_string(),
            osrm_url: "http://127.0.0.1:1".to_string(),
            osrm_profile: "driving".to_string(),
            route_alternatives: true,
            autocomplete_debounce: Duration::from_millis(10),
            notification_poll: Duration::from_secs(1),
            http_timeout: None,
            backend: Backend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Build the shared outbound HTTP client.
    pub fn http_client(&self) -> reqwest::Client {
        let mut builder = reqwest::Client::builder().user_agent(&self.geocoder_user_agent);
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
    }
}

fn parse_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name).as_deref().map(str::trim) {
        Ok("true") | Ok("1") => Ok(true),
        Ok("false") | Ok("0") => Ok(false),
        Ok(_) => Err(ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
