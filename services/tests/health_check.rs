use axum::http::StatusCode;
use zkt_admin_services::database::MockStorage;

mod common;

#[tokio::test]
async fn test_health_check_integration() {
    // Case 1: Connected
    let server = common::test_server(MockStorage::new()).await;

    let response = server.get("/is-health").await;
    response.assert_status(StatusCode::OK);
    response.assert_text("OK");
    assert_eq!(response.header("x-service-env"), "test");

    // Case 2: Disconnected
    let server = common::test_server(MockStorage::disconnected()).await;

    let response = server.get("/is-health").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_storage_outage_is_service_unavailable() {
    let server = common::test_server(MockStorage::disconnected()).await;

    let response = server.get("/users").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "service_unavailable");
}
