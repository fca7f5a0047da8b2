// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use ontheway::error::AppError;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_user_facing_messages_are_returned() {
    let (status, body) = render(AppError::AuthFailed("No user found with this email.".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "auth_failed");
    assert_eq!(body["details"], "No user found with this email.");

    let (status, body) = render(AppError::Unavailable("Try again".into())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "Try again");
}

#[tokio::test]
async fn test_access_denied_carries_redirect() {
    let (status, body) = render(AppError::AccessDenied {
        message: "Wrong surface".into(),
        redirect: "riderLogin.html".into(),
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "riderLogin.html");
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let (status, body) = render(AppError::Database("connection reset".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());

    let (status, body) = render(AppError::InvalidToken).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
    assert!(body.get("details").is_none());
}

#[test]
fn test_is_not_found() {
    assert!(AppError::NotFound("x".into()).is_not_found());
    assert!(!AppError::BadRequest("x".into()).is_not_found());
}
