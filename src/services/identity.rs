// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider boundary.
//!
//! Handles:
//! - Account creation and password sign-in
//! - Verification and password reset emails
//! - Mapping vendor error codes to `AuthErrorCode`
//!
//! `FirebaseAuthClient` talks to the Identity Toolkit REST API with the
//! project's public web API key. `MemoryIdentityProvider` is used for local
//! mode and tests.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// An authenticated account as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    /// Short-lived provider token, used for follow-up calls like verification.
    pub id_token: String,
}

/// Provider rejection reasons the flows distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    InvalidCredentials,
    /// Anything the flows report with their generic message
    Other(String),
}

impl AuthErrorCode {
    /// Map an Identity Toolkit error message (`CODE` or `CODE : detail`).
    pub fn from_vendor(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message).trim();
        match code {
            "EMAIL_EXISTS" => AuthErrorCode::EmailAlreadyInUse,
            "INVALID_EMAIL" => AuthErrorCode::InvalidEmail,
            "WEAK_PASSWORD" => AuthErrorCode::WeakPassword,
            "EMAIL_NOT_FOUND" => AuthErrorCode::UserNotFound,
            "INVALID_PASSWORD" => AuthErrorCode::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" => AuthErrorCode::InvalidCredentials,
            other => AuthErrorCode::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("rejected by identity provider: {0:?}")]
    Rejected(AuthErrorCode),

    #[error("identity provider unavailable: {0}")]
    Transport(String),
}

/// Hosted authentication operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str)
        -> Result<Identity, IdentityError>;

    /// Password sign-in. The returned identity carries the verification flag.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn send_email_verification(&self, id_token: &str) -> Result<(), IdentityError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Resolve a provider token back to its account.
    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError>;
}

// ─── Firebase Identity Toolkit ───────────────────────────────────────

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirebaseAuthClient {
    /// Create a client. Honors `FIREBASE_AUTH_EMULATOR_HOST` for local runs.
    pub fn new(http: reqwest::Client, api_key: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => IDENTITY_TOOLKIT_URL.to_string(),
        };
        Self::with_base_url(http, api_key, &base_url)
    }

    pub fn with_base_url(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.base_url,
            method,
            urlencoding::encode(&self.api_key)
        )
    }

    /// POST a JSON body and decode the response, mapping vendor errors.
    async fn call<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, IdentityError> {
        let response = self
            .http
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => {
                    tracing::debug!(method, code = %envelope.error.message, "Identity Toolkit rejected request");
                    Err(IdentityError::Rejected(AuthErrorCode::from_vendor(
                        &envelope.error.message,
                    )))
                }
                Err(_) => Err(IdentityError::Transport(format!("HTTP {}: {}", status, text))),
            };
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(format!("JSON parse error: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let token: TokenResponse = self.call("signUp", &body).await?;
        tracing::info!(uid = %token.local_id, "Created identity account");

        Ok(Identity {
            uid: token.local_id,
            email: if token.email.is_empty() { email.to_string() } else { token.email },
            email_verified: false,
            id_token: token.id_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let token: TokenResponse = self.call("signInWithPassword", &body).await?;

        // signInWithPassword does not report verification status.
        self.lookup(&token.id_token).await
    }

    async fn send_email_verification(&self, id_token: &str) -> Result<(), IdentityError> {
        let body = OobRequest {
            request_type: "VERIFY_EMAIL",
            id_token: Some(id_token),
            email: None,
        };
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let body = OobRequest {
            request_type: "PASSWORD_RESET",
            id_token: None,
            email: Some(email),
        };
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::Rejected(AuthErrorCode::UserNotFound))?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            email_verified: user.email_verified,
            id_token: id_token.to_string(),
        })
    }
}

// ─── In-memory provider ──────────────────────────────────────────────

/// Emails the in-memory provider "sent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEmail {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    uid: String,
    password: String,
    email_verified: bool,
}

/// In-process identity provider with Firebase's validation rules.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    /// Keyed by lowercased email
    accounts: DashMap<String, MemoryAccount>,
    /// Token -> email
    tokens: DashMap<String, String>,
    /// Email -> the one live token for that account
    live_tokens: DashMap<String, String>,
    outbox: DashMap<String, Vec<OutboundEmail>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account's email as verified (the user clicked the link).
    pub fn verify_email(&self, email: &str) -> bool {
        match self.accounts.get_mut(&email.to_lowercase()) {
            Some(mut account) => {
                account.email_verified = true;
                true
            }
            None => false,
        }
    }

    /// Emails sent to `email`, in order.
    pub fn sent_to(&self, email: &str) -> Vec<OutboundEmail> {
        self.outbox
            .get(&email.to_lowercase())
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Provider tokens still accepted by `lookup`.
    pub fn live_token_count(&self) -> usize {
        self.tokens.len()
    }

    fn issue(&self, email: &str, account: &MemoryAccount) -> Identity {
        let id_token = format!("mem.{}.{}", account.uid, uuid::Uuid::new_v4().simple());
        if let Some(previous) = self.live_tokens.insert(email.to_string(), id_token.clone()) {
            self.tokens.remove(&previous);
        }
        self.tokens.insert(id_token.clone(), email.to_string());
        Identity {
            uid: account.uid.clone(),
            email: email.to_string(),
            email_verified: account.email_verified,
            id_token,
        }
    }

    fn record(&self, email: &str, kind: OutboundEmail) {
        self.outbox.entry(email.to_string()).or_default().push(kind);
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(IdentityError::Rejected(AuthErrorCode::InvalidEmail));
        }
        if password.chars().count() < 6 {
            return Err(IdentityError::Rejected(AuthErrorCode::WeakPassword));
        }

        let account = match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(IdentityError::Rejected(AuthErrorCode::EmailAlreadyInUse))
            }
            Entry::Vacant(slot) => {
                let account = MemoryAccount {
                    uid: uuid::Uuid::new_v4().simple().to_string(),
                    password: password.to_string(),
                    email_verified: false,
                };
                slot.insert(account.clone());
                account
            }
        };

        Ok(self.issue(&email, &account))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(IdentityError::Rejected(AuthErrorCode::InvalidEmail));
        }
        let account = self
            .accounts
            .get(&email)
            .map(|a| a.clone())
            .ok_or(IdentityError::Rejected(AuthErrorCode::UserNotFound))?;
        if account.password != password {
            return Err(IdentityError::Rejected(AuthErrorCode::WrongPassword));
        }
        Ok(self.issue(&email, &account))
    }

    async fn send_email_verification(&self, id_token: &str) -> Result<(), IdentityError> {
        let email = self
            .tokens
            .get(id_token)
            .map(|e| e.clone())
            .ok_or(IdentityError::Rejected(AuthErrorCode::Other(
                "INVALID_ID_TOKEN".to_string(),
            )))?;
        self.record(&email, OutboundEmail::Verification);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(IdentityError::Rejected(AuthErrorCode::InvalidEmail));
        }
        if !self.accounts.contains_key(&email) {
            return Err(IdentityError::Rejected(AuthErrorCode::UserNotFound));
        }
        self.record(&email, OutboundEmail::PasswordReset);
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError> {
        let email = self
            .tokens
            .get(id_token)
            .map(|e| e.clone())
            .ok_or(IdentityError::Rejected(AuthErrorCode::UserNotFound))?;
        let account = self
            .accounts
            .get(&email)
            .map(|a| a.clone())
            .ok_or(IdentityError::Rejected(AuthErrorCode::UserNotFound))?;

        Ok(Identity {
            uid: account.uid,
            email,
            email_verified: account.email_verified,
            id_token: id_token.to_string(),
        })
    }
}
