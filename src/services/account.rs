// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, password reset and the role gate.
//!
//! Passenger and rider flows are the same code parameterized by `Surface`.
//! Provider errors are mapped to messages per flow; the session itself is
//! issued by the HTTP layer only when `login` succeeds.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::identity::{AuthErrorCode, IdentityError, IdentityProvider};
use crate::db::RideStore;
use crate::error::AppError;
use crate::models::{Role, User};

pub const LOGIN_REQUIRED_FOR_PAGE: &str = "Please log in to access this page.";
pub const ROLE_NOT_FOUND: &str = "User role not found. Please contact support.";
pub const EMAIL_NOT_VERIFIED: &str =
    "Your email is not verified. Please check your inbox for the verification email.";
pub const PASSWORD_RESET_SENT: &str = "Password reset email sent! Please check your inbox.";
pub const LOGGED_OUT: &str = "You have successfully logged out.";

/// The page set one role uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Surface {
    pub role: Role,
    pub login_page: &'static str,
    pub register_page: &'static str,
    pub dashboard_page: &'static str,
    pub require_verified_email: bool,
}

impl Surface {
    pub const PASSENGER: Surface = Surface {
        role: Role::Passenger,
        login_page: "login.html",
        register_page: "register.html",
        dashboard_page: "index.html",
        require_verified_email: true,
    };

    pub const RIDER: Surface = Surface {
        role: Role::Rider,
        login_page: "riderLogin.html",
        register_page: "riderRegister.html",
        dashboard_page: "riderDashboard.html",
        require_verified_email: false,
    };

    pub fn for_role(role: Role) -> &'static Surface {
        match role {
            Role::Passenger => &Self::PASSENGER,
            Role::Rider => &Self::RIDER,
        }
    }
}

/// Which flow a provider error came from; decides the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Register,
    Login,
    PasswordReset,
}

impl AuthFlow {
    /// User-facing message for a provider rejection in this flow.
    pub fn message(&self, code: &AuthErrorCode) -> &'static str {
        use AuthErrorCode::*;
        match (self, code) {
            (AuthFlow::Register, EmailAlreadyInUse) => {
                "This email is already in use. Please use a different email."
            }
            (AuthFlow::Register, InvalidEmail) => {
                "The email address is invalid. Please enter a valid email."
            }
            (AuthFlow::Register, WeakPassword) => {
                "The password is too weak. Please choose a stronger password."
            }
            (AuthFlow::Register, _) => "Registration failed. Please try again.",

            (AuthFlow::Login, UserNotFound) => "No user found with this email.",
            (AuthFlow::Login, WrongPassword) => "Incorrect password. Please try again.",
            (AuthFlow::Login, InvalidCredentials) => {
                "Incorrect email or password. Please try again."
            }
            (AuthFlow::Login, InvalidEmail) => "Invalid email address.",
            (AuthFlow::Login, _) => "Login failed. Please try again.",

            (AuthFlow::PasswordReset, UserNotFound) => "No user found with this email.",
            (AuthFlow::PasswordReset, InvalidEmail) => "Invalid email address.",
            (AuthFlow::PasswordReset, _) => {
                "Failed to send password reset email. Please try again."
            }
        }
    }

    fn failure(&self, err: IdentityError) -> AppError {
        match err {
            IdentityError::Rejected(code) => {
                tracing::info!(flow = ?self, ?code, "Identity provider rejected request");
                AppError::AuthFailed(self.message(&code).to_string())
            }
            IdentityError::Transport(msg) => {
                tracing::warn!(flow = ?self, error = %msg, "Identity provider unreachable");
                let generic = self.message(&AuthErrorCode::Other(String::new()));
                AppError::AuthFailed(generic.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub name: String,
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub email: String,
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Please enter both email and password."))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter both email and password."))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetForm {
    #[validate(length(min = 1, message = "Invalid email address."))]
    pub email: String,
}

/// Message plus where the browser should go next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// A successful login; the caller issues the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub user: User,
    pub redirect: &'static str,
}

/// Result of checking a session against a dashboard's role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// No session; go to the login page
    Redirect { message: String, redirect: String },
    /// Session must be cleared; go to the given login page
    SignedOut { message: String, redirect: String },
    Granted { name: String, role: Role },
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RideStore>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RideStore>) -> Self {
        Self { identity, store }
    }

    /// Create an account on `surface` and write its profile.
    pub async fn register(
        &self,
        surface: &Surface,
        form: RegisterForm,
    ) -> Result<FlowOutcome, AppError> {
        let form = RegisterForm {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password,
        };
        form.validate()?;

        let identity = self
            .identity
            .create_account(&form.email, &form.password)
            .await
            .map_err(|e| AuthFlow::Register.failure(e))?;

        if let Err(e) = self.identity.send_email_verification(&identity.id_token).await {
            tracing::warn!(uid = %identity.uid, error = %e, "Failed to send verification email");
        }

        let user = User {
            uid: identity.uid.clone(),
            name: form.name,
            email: identity.email,
            role: surface.role,
            created_at: Some(Utc::now()),
        };
        if let Err(e) = self.store.create_user(&user).await {
            tracing::error!(uid = %user.uid, error = %e, "Failed to write user profile");
            return Err(AppError::AuthFailed(
                AuthFlow::Register
                    .message(&AuthErrorCode::Other(String::new()))
                    .to_string(),
            ));
        }

        tracing::info!(uid = %user.uid, role = %surface.role, "User registered");

        Ok(FlowOutcome {
            message: format!(
                "Registration successful! A verification email has been sent to your email \
                 address. Please verify your email before logging in as a {}.",
                surface.role
            ),
            redirect: Some(surface.login_page.to_string()),
        })
    }

    /// Sign in on `surface`. Only a role match succeeds.
    pub async fn login(&self, surface: &Surface, form: LoginForm) -> Result<LoginSuccess, AppError> {
        let form = LoginForm {
            email: form.email.trim().to_string(),
            password: form.password,
        };
        form.validate()?;

        let identity = self
            .identity
            .sign_in(&form.email, &form.password)
            .await
            .map_err(|e| AuthFlow::Login.failure(e))?;

        if surface.require_verified_email && !identity.email_verified {
            tracing::info!(uid = %identity.uid, "Login refused: email not verified");
            return Err(AppError::AuthFailed(EMAIL_NOT_VERIFIED.to_string()));
        }

        let user = match self.store.get_user(&identity.uid).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(uid = %identity.uid, error = %e, "Failed to read user profile");
                return Err(AppError::AuthFailed(
                    AuthFlow::Login
                        .message(&AuthErrorCode::Other(String::new()))
                        .to_string(),
                ));
            }
        };

        if let GateDecision::SignedOut { message, redirect }
        | GateDecision::Redirect { message, redirect } = Self::check_role(surface, user.as_ref())
        {
            tracing::info!(uid = %identity.uid, expected = %surface.role, "Login refused by role gate");
            return Err(AppError::AccessDenied { message, redirect });
        }
        let Some(user) = user else {
            return Err(AppError::AccessDenied {
                message: ROLE_NOT_FOUND.to_string(),
                redirect: surface.login_page.to_string(),
            });
        };

        tracing::info!(uid = %user.uid, role = %user.role, "User logged in");
        Ok(LoginSuccess {
            user,
            redirect: surface.dashboard_page,
        })
    }

    pub async fn reset_password(&self, form: PasswordResetForm) -> Result<FlowOutcome, AppError> {
        let form = PasswordResetForm {
            email: form.email.trim().to_string(),
        };
        form.validate()?;

        self.identity
            .send_password_reset(&form.email)
            .await
            .map_err(|e| AuthFlow::PasswordReset.failure(e))?;

        Ok(FlowOutcome {
            message: PASSWORD_RESET_SENT.to_string(),
            redirect: None,
        })
    }

    /// Decide whether `uid` may use the dashboard of `surface`.
    pub async fn gate(&self, surface: &Surface, uid: Option<&str>) -> Result<GateDecision, AppError> {
        let Some(uid) = uid else {
            return Ok(GateDecision::Redirect {
                message: LOGIN_REQUIRED_FOR_PAGE.to_string(),
                redirect: surface.login_page.to_string(),
            });
        };

        let user = self.store.get_user(uid).await?;
        let decision = Self::check_role(surface, user.as_ref());
        if let GateDecision::SignedOut { .. } = decision {
            tracing::info!(uid, expected = %surface.role, "Gate signed session out");
        }
        Ok(decision)
    }

    /// Current user's profile.
    pub async fn profile(&self, uid: &str) -> Result<User, AppError> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(ROLE_NOT_FOUND.to_string()))
    }

    fn check_role(surface: &Surface, user: Option<&User>) -> GateDecision {
        match user {
            None => GateDecision::SignedOut {
                message: ROLE_NOT_FOUND.to_string(),
                redirect: surface.login_page.to_string(),
            },
            Some(user) if user.role != surface.role => GateDecision::SignedOut {
                message: format!(
                    "This email is registered as a {}. Please log in through the appropriate {} login page.",
                    user.role,
                    user.role.title()
                ),
                redirect: Surface::for_role(user.role).login_page.to_string(),
            },
            Some(user) => GateDecision::Granted {
                name: user.display_name(),
                role: user.role,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::services::identity::MemoryIdentityProvider;

    fn setup() -> (AccountService, Arc<MemoryIdentityProvider>, MemoryStore) {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let store = MemoryStore::new();
        let service = AccountService::new(identity.clone(), Arc::new(store.clone()));
        (service, identity, store)
    }

    fn register_form(email: &str) -> RegisterForm {
        RegisterForm {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    fn login_form(email: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_writes_profile_and_sends_verification() {
        let (service, identity, store) = setup();
        let outcome = service
            .register(&Surface::RIDER, register_form("ada@example.com"))
            .await
            .unwrap();

        assert!(outcome.message.ends_with("before logging in as a rider."));
        assert_eq!(outcome.redirect.as_deref(), Some("riderLogin.html"));
        assert_eq!(store.count(collections::USERS), 1);
        assert_eq!(identity.sent_to("ada@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_without_second_profile() {
        let (service, _, store) = setup();
        service
            .register(&Surface::PASSENGER, register_form("dup@example.com"))
            .await
            .unwrap();

        let err = service
            .register(&Surface::RIDER, register_form("dup@example.com"))
            .await
            .unwrap_err();
        match err {
            AppError::AuthFailed(msg) => assert_eq!(
                msg,
                "This email is already in use. Please use a different email."
            ),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(store.count(collections::USERS), 1);
    }

    #[tokio::test]
    async fn test_register_presence_check() {
        let (service, identity, _) = setup();
        let mut form = register_form("x@example.com");
        form.name = "   ".to_string();

        let err = service.register(&Surface::PASSENGER, form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Please fill in all required fields."));
        assert_eq!(identity.account_count(), 0);
    }

    #[tokio::test]
    async fn test_passenger_login_requires_verified_email() {
        let (service, identity, _) = setup();
        service
            .register(&Surface::PASSENGER, register_form("p@example.com"))
            .await
            .unwrap();

        let err = service
            .login(&Surface::PASSENGER, login_form("p@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthFailed(ref m) if m == EMAIL_NOT_VERIFIED));

        identity.verify_email("p@example.com");
        let ok = service
            .login(&Surface::PASSENGER, login_form("p@example.com"))
            .await
            .unwrap();
        assert_eq!(ok.redirect, "index.html");
        assert_eq!(ok.user.role, Role::Passenger);
    }

    #[tokio::test]
    async fn test_role_mismatch_never_reaches_dashboard() {
        let (service, identity, _) = setup();
        service
            .register(&Surface::RIDER, register_form("r2@example.com"))
            .await
            .unwrap();
        identity.verify_email("r2@example.com");
        match service
            .login(&Surface::PASSENGER, login_form("r2@example.com"))
            .await
            .unwrap_err()
        {
            AppError::AccessDenied { message, redirect } => {
                assert_eq!(
                    message,
                    "This email is registered as a rider. Please log in through the appropriate Rider login page."
                );
                assert_eq!(redirect, "riderLogin.html");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_error_messages() {
        let (service, _, _) = setup();
        let err = service
            .login(&Surface::RIDER, login_form("ghost@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthFailed(ref m) if m == "No user found with this email."));

        let err = service
            .login(
                &Surface::RIDER,
                LoginForm {
                    email: "".to_string(),
                    password: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Please enter both email and password."));
    }

    #[test]
    fn test_unhandled_vendor_codes_use_generic_message() {
        for vendor in ["USER_DISABLED", "TOO_MANY_ATTEMPTS_TRY_LATER : Access blocked"] {
            let code = AuthErrorCode::from_vendor(vendor);
            assert_eq!(AuthFlow::Login.message(&code), "Login failed. Please try again.");
            assert_eq!(
                AuthFlow::Register.message(&code),
                "Registration failed. Please try again."
            );
            assert_eq!(
                AuthFlow::PasswordReset.message(&code),
                "Failed to send password reset email. Please try again."
            );
        }
    }

    #[tokio::test]
    async fn test_gate_outcomes() {
        let (service, _, store) = setup();

        let decision = service.gate(&Surface::RIDER, None).await.unwrap();
        assert_eq!(
            decision,
            GateDecision::Redirect {
                message: LOGIN_REQUIRED_FOR_PAGE.to_string(),
                redirect: "riderLogin.html".to_string(),
            }
        );

        let decision = service.gate(&Surface::RIDER, Some("ghost")).await.unwrap();
        assert!(matches!(decision, GateDecision::SignedOut { ref message, .. } if message == ROLE_NOT_FOUND));

        store
            .create_user(&User {
                uid: "u1".to_string(),
                name: String::new(),
                email: "sam@example.com".to_string(),
                role: Role::Rider,
                created_at: None,
            })
            .await
            .unwrap();
        let decision = service.gate(&Surface::RIDER, Some("u1")).await.unwrap();
        assert_eq!(
            decision,
            GateDecision::Granted {
                name: "sam".to_string(),
                role: Role::Rider
            }
        );
    }

    #[tokio::test]
    async fn test_password_reset_messages() {
        let (service, _, _) = setup();
        let err = service
            .reset_password(PasswordResetForm {
                email: "ghost@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthFailed(ref m) if m == "No user found with this email."));

        service
            .register(&Surface::PASSENGER, register_form("p@example.com"))
            .await
            .unwrap();
        let ok = service
            .reset_password(PasswordResetForm {
                email: "p@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.message, PASSWORD_RESET_SENT);
    }
}
