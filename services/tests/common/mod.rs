//! Shared test utilities for integration tests.
//!
//! Every test runs the full router over `MockStorage`; none needs a live
//! PostgreSQL.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use zkt_admin_services::{
    auth::generate_session_token, config::Config, database::MockStorage, routes,
};

/// JWT secret baked into `Config::new_for_test`.
#[allow(dead_code)]
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-local-development";

/// Builds a test server over `storage` with the test configuration.
pub async fn test_server(storage: MockStorage) -> TestServer {
    let app = routes(storage, Config::new_for_test()).await;
    TestServer::new(app).unwrap()
}

/// Registers a user through the public endpoint.
#[allow(dead_code)]
pub async fn add_user(server: &TestServer, username: &str, password: &str, role: &str) {
    server
        .post("/add_user")
        .json(&json!({"username": username, "password": password, "role": role}))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Logs in and returns the session token.
#[allow(dead_code)]
pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/")
        .json(&json!({"username": username, "password": password}))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["token"]
        .as_str()
        .expect("login response should carry a token")
        .to_owned()
}

/// A token for `username` signed with the test secret, bypassing login.
#[allow(dead_code)]
pub fn token_for(username: &str) -> String {
    generate_session_token(username, TEST_JWT_SECRET, 15).unwrap()
}
