// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, role gate and logout over HTTP.

use axum::http::StatusCode;
use ontheway::models::Role;
use ontheway::services::identity::OutboundEmail;
use serde_json::json;

mod common;
use common::{create_test_app, set_cookies, TestApp};

async fn register(app: &TestApp, role: &str, email: &str) -> serde_json::Value {
    let (status, _, body) = app
        .post(
            &format!("/auth/{}/register", role),
            None,
            json!({ "name": "Ada Lovelace", "email": email, "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

fn login_body(email: &str) -> serde_json::Value {
    json!({ "email": email, "password": "secret123" })
}

fn session_cookie_set(cookies: &[String]) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with("ontheway_token=") && !c.contains("Max-Age=0"))
}

fn session_cookie_cleared(cookies: &[String]) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with("ontheway_token=") && c.contains("Max-Age=0"))
}

#[tokio::test]
async fn test_passenger_register_verify_login() {
    let app = create_test_app();

    let body = register(&app, "passenger", "ada@example.com").await;
    assert_eq!(
        body["message"],
        "Registration successful! A verification email has been sent to your email address. \
         Please verify your email before logging in as a passenger."
    );
    assert_eq!(body["redirect"], "login.html");
    assert_eq!(app.store.count("users"), 1);
    assert_eq!(
        app.identity.sent_to("ada@example.com"),
        vec![OutboundEmail::Verification]
    );

    // Unverified: refused, no session issued
    let (status, headers, body) = app
        .post("/auth/passenger/login", None, login_body("ada@example.com"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        "Your email is not verified. Please check your inbox for the verification email."
    );
    assert!(!session_cookie_set(&set_cookies(&headers)));

    assert!(app.identity.verify_email("ada@example.com"));
    let (status, headers, body) = app
        .post("/auth/passenger/login", None, login_body("ada@example.com"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "index.html");
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["role"], "passenger");
    assert!(session_cookie_set(&set_cookies(&headers)));

    // The issued token works on protected routes
    let token = body["token"].as_str().unwrap();
    let (status, _, me) = app.get("/api/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_rider_login_does_not_require_verification() {
    let app = create_test_app();
    register(&app, "rider", "rita@example.com").await;

    let (status, headers, body) = app
        .post("/auth/rider/login", None, login_body("rita@example.com"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "riderDashboard.html");
    assert!(session_cookie_set(&set_cookies(&headers)));
}

#[tokio::test]
async fn test_register_presence_check() {
    let app = create_test_app();

    let (status, _, body) = app
        .post(
            "/auth/passenger/register",
            None,
            json!({ "name": "  ", "email": "ada@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Please fill in all required fields.");
    assert_eq!(app.identity.account_count(), 0);
    assert_eq!(app.store.count("users"), 0);
}

#[tokio::test]
async fn test_register_provider_errors() {
    let app = create_test_app();
    register(&app, "passenger", "ada@example.com").await;

    let (status, _, body) = app
        .post(
            "/auth/rider/register",
            None,
            json!({ "name": "Ada", "email": "ada@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        "This email is already in use. Please use a different email."
    );

    let (_, _, body) = app
        .post(
            "/auth/rider/register",
            None,
            json!({ "name": "Bob", "email": "bob@example.com", "password": "123" }),
        )
        .await;
    assert_eq!(
        body["details"],
        "The password is too weak. Please choose a stronger password."
    );

    // Neither failure wrote a profile
    assert_eq!(app.store.count("users"), 1);
}

#[tokio::test]
async fn test_login_error_messages() {
    let app = create_test_app();
    register(&app, "rider", "rita@example.com").await;

    let (_, _, body) = app
        .post("/auth/rider/login", None, json!({ "email": "", "password": "x" }))
        .await;
    assert_eq!(body["details"], "Please enter both email and password.");

    let (_, _, body) = app
        .post(
            "/auth/rider/login",
            None,
            json!({ "email": "rita@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(body["details"], "Incorrect password. Please try again.");

    let (_, _, body) = app
        .post("/auth/rider/login", None, login_body("nobody@example.com"))
        .await;
    assert_eq!(body["details"], "No user found with this email.");
}

#[tokio::test]
async fn test_login_on_wrong_surface_signs_out() {
    let app = create_test_app();
    register(&app, "rider", "rita@example.com").await;
    app.identity.verify_email("rita@example.com");

    let (status, headers, body) = app
        .post("/auth/passenger/login", None, login_body("rita@example.com"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");
    assert_eq!(
        body["details"],
        "This email is registered as a rider. Please log in through the appropriate Rider login page."
    );
    assert_eq!(body["redirect"], "riderLogin.html");

    let cookies = set_cookies(&headers);
    assert!(session_cookie_cleared(&cookies));
    assert!(!session_cookie_set(&cookies));
}

#[tokio::test]
async fn test_unknown_surface_is_rejected() {
    let app = create_test_app();

    let (status, _, _) = app
        .post("/auth/driver/login", None, login_body("a@example.com"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset() {
    let app = create_test_app();
    register(&app, "passenger", "ada@example.com").await;

    let (status, _, body) = app
        .post(
            "/auth/password-reset",
            None,
            json!({ "email": "ada@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Password reset email sent! Please check your inbox."
    );
    assert_eq!(
        app.identity.sent_to("ada@example.com").last(),
        Some(&OutboundEmail::PasswordReset)
    );

    let (status, _, body) = app
        .post(
            "/auth/password-reset",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "No user found with this email.");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = create_test_app();
    let token = app.seed_user("p1", Role::Passenger).await;

    let (status, headers, body) = app.post("/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have successfully logged out.");
    assert_eq!(body["redirect"], "login.html");
    assert!(session_cookie_cleared(&set_cookies(&headers)));

    // Logging out without a session is harmless
    let (status, _, _) = app.post("/auth/logout", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_gate() {
    let app = create_test_app();

    let (status, _, body) = app.get("/api/gate/passenger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"], "redirect");
    assert_eq!(body["message"], "Please log in to access this page.");
    assert_eq!(body["redirect"], "login.html");

    let token = app.seed_user("p1", Role::Passenger).await;
    let (_, headers, body) = app.get("/api/gate/passenger", Some(&token)).await;
    assert_eq!(body["decision"], "granted");
    assert_eq!(body["name"], "User p1");
    assert!(set_cookies(&headers).is_empty());

    let (_, headers, body) = app.get("/api/gate/rider", Some(&token)).await;
    assert_eq!(body["decision"], "signed_out");
    assert_eq!(body["redirect"], "login.html");
    assert!(session_cookie_cleared(&set_cookies(&headers)));
}
