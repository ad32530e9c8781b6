//! Registration, login and token checks through the full router.

use axum::http::StatusCode;
use serde_json::json;
use zkt_admin_services::{auth::generate_session_token, database::MockStorage};

mod common;

#[tokio::test]
async fn test_register_then_login() {
    let server = common::test_server(MockStorage::new()).await;

    common::add_user(&server, "alice", "pw123", "user").await;

    // Second registration with the same name is refused
    let response = server
        .post("/add_user")
        .json(&json!({"username": "alice", "password": "other", "role": "admin"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // The original password still works and the role did not change
    let response = server
        .post("/")
        .json(&json!({"username": "alice", "password": "pw123"}))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let response = server
        .post("/")
        .json(&json!({"username": "alice", "password": "wrong"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_user_is_listed_immediately() {
    let server = common::test_server(MockStorage::new()).await;
    common::add_user(&server, "bob", "pw", "admin").await;

    let users: serde_json::Value = server.get("/users").await.json();
    assert_eq!(
        users,
        json!([{"username": "bob", "role": "admin", "active": true}])
    );
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in() {
    let server = common::test_server(MockStorage::new()).await;
    common::add_user(&server, "alice", "pw123", "user").await;

    // Empty body toggles
    let response = server.post("/users/alice/activate").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["active"], false);

    server
        .post("/")
        .json(&json!({"username": "alice", "password": "pw123"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Explicit reactivation
    server
        .post("/users/alice/activate")
        .json(&json!({"active": true}))
        .await
        .assert_status_ok();

    common::login(&server, "alice", "pw123").await;
}

#[tokio::test]
async fn test_reset_password_replaces_credential() {
    let server = common::test_server(MockStorage::new()).await;
    common::add_user(&server, "alice", "old-pw", "user").await;

    server
        .post("/users/alice/reset-password")
        .json(&json!({"password": "new-pw"}))
        .await
        .assert_status_ok();

    server
        .post("/")
        .json(&json!({"username": "alice", "password": "old-pw"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    common::login(&server, "alice", "new-pw").await;
}

#[tokio::test]
async fn test_token_grants_access_to_protected_routes() {
    let server = common::test_server(MockStorage::new()).await;
    common::add_user(&server, "alice", "pw123", "user").await;
    let token = common::login(&server, "alice", "pw123").await;

    let response = server.get("/protected").authorization_bearer(&token).await;
    response.assert_status_ok();
    response.assert_json(&json!({"logged_in_as": "alice"}));

    let response = server.get("/auth/status").authorization_bearer(&token).await;
    response.assert_status_ok();
    response.assert_json(&json!({"authenticated": true, "user": "alice"}));
}

#[tokio::test]
async fn test_missing_and_bad_tokens_are_rejected() {
    let server = common::test_server(MockStorage::new()).await;

    server
        .get("/protected")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/protected")
        .authorization_bearer("garbage")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let foreign = generate_session_token("alice", "some-other-secret", 15).unwrap();
    server
        .get("/protected")
        .authorization_bearer(&foreign)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let server = common::test_server(MockStorage::new()).await;
    let expired = generate_session_token("alice", common::TEST_JWT_SECRET, -10).unwrap();

    let response = server.get("/logs").authorization_bearer(&expired).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Token has expired");
}

#[tokio::test]
async fn test_token_outlives_deactivation() {
    let server = common::test_server(MockStorage::new()).await;
    common::add_user(&server, "alice", "pw123", "user").await;
    let token = common::login(&server, "alice", "pw123").await;

    server
        .post("/users/alice/activate")
        .json(&json!({"active": false}))
        .await
        .assert_status_ok();

    // No revocation: the token stays valid until it expires
    server
        .get("/protected")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}
