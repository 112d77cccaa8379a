mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use guroosh_core::UserStore;
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn().await;
    let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, body) = app.get("/api/expenses", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::spawn().await;
    let alice = app.register("Alice", "Alice@Example.com").await;

    let (status, me) = app.get("/api/auth/me", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["role"], "user");
    assert_eq!(me["emailVerified"], false);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Again", "email": "alice@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");

    let (status, body) = app.login("alice@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = app.login("ALICE@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], alice.id.as_str());

    let (status, me) = app
        .put("/api/auth/me", &alice.token, json!({ "name": "Alice B.", "phone": "555-0100" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice B.");
    assert_eq!(me["phone"], "555-0100");
}

#[tokio::test]
async fn short_passwords_are_rejected() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 6"));
}

#[tokio::test]
async fn email_verification_and_password_reset() {
    let app = TestApp::spawn().await;
    let carol = app.register("Carol", "carol@example.com").await;

    let credentials = app
        .store
        .get_credentials_by_email("carol@example.com")
        .await
        .unwrap();
    let verification = credentials.verification_token.expect("token issued at signup");
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/verify-email",
            None,
            Some(json!({ "token": verification })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, me) = app.get("/api/auth/me", &carol.token).await;
    assert_eq!(me["emailVerified"], true);

    // Unknown addresses get the same answer as known ones.
    for email in ["carol@example.com", "nobody@example.com"] {
        let (status, _) = app
            .call(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({ "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let reset = app
        .store
        .get_credentials_by_email("carol@example.com")
        .await
        .unwrap()
        .reset_token
        .expect("reset token stored");
    let reset_body = json!({ "token": reset, "password": "new-secret" });
    let (status, _) = app
        .call(Method::POST, "/api/auth/reset-password", None, Some(reset_body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::POST, "/api/auth/reset-password", None, Some(reset_body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired reset token");

    let (status, _) = app.login("carol@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("carol@example.com", "new-secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn settings_default_then_change() {
    let app = TestApp::spawn().await;
    let dave = app.register("Dave", "dave@example.com").await;

    let (status, settings) = app.get("/api/settings", &dave.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["theme"], "system");
    assert_eq!(settings["currency"], "SAR");

    let (status, settings) = app
        .put("/api/settings", &dave.token, json!({ "theme": "dark", "currency": "eur" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["theme"], "dark");
    assert_eq!(settings["currency"], "EUR");

    let (status, body) = app
        .post(
            "/api/settings/password",
            &dave.token,
            json!({ "currentPassword": "nope-nope", "newPassword": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = app
        .post(
            "/api/settings/password",
            &dave.token,
            json!({ "currentPassword": "secret123", "newPassword": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.login("dave@example.com", "another1").await;
    assert_eq!(status, StatusCode::OK);
}
