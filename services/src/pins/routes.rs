//! PIN endpoints. The `qr` in the paths is historical: clients render the
//! returned PIN as a QR code.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::service::{IssuedPin, count_for_day, issue_pin, reset_for_day};
use crate::auth::{MessageResponse, RequireAuth};
use crate::error::{ApiError, ApiJson};
use crate::state::{AdminStorage, AppState};

#[derive(Debug, Deserialize)]
pub struct GeneratePinRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PinCountResponse {
    pub count: i64,
}

/// Creates the router for PIN endpoints.
pub fn routes<S: AdminStorage>() -> Router<AppState<S>> {
    Router::new()
        .route("/generate-qr", post(generate_pin::<S>))
        .route("/user-qr-count/{username}", get(pin_count::<S>))
        .route("/user-qr-reset/{username}", get(pin_reset::<S>))
}

/// Handler for `POST /generate-qr`.
///
/// # Response
///
/// ```json
/// { "pin": "042917", "expires_at": "2026-10-15T08:45:00Z" }
/// ```
#[tracing::instrument(skip_all, fields(actor = %auth.username(), username = tracing::field::Empty))]
async fn generate_pin<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
    ApiJson(payload): ApiJson<GeneratePinRequest>,
) -> Result<Json<IssuedPin>, ApiError> {
    let username = payload
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Username is required"))?;
    tracing::Span::current().record("username", username.as_str());

    let issued = issue_pin(&state.storage, &username, Utc::now()).await?;
    tracing::info!(expires_at = %issued.expires_at, "PIN issued");

    Ok(Json(issued))
}

#[tracing::instrument(skip_all, fields(actor = %auth.username(), username = %username))]
async fn pin_count<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
) -> Result<Json<PinCountResponse>, ApiError> {
    let count = count_for_day(&state.storage, &username, Utc::now()).await?;
    Ok(Json(PinCountResponse { count }))
}

#[tracing::instrument(skip_all, fields(actor = %auth.username(), username = %username))]
async fn pin_reset<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = reset_for_day(&state.storage, &username, Utc::now()).await?;
    tracing::info!(removed, "Daily PIN count reset");

    Ok(MessageResponse::new("User QR count reset for today"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_session_token;
    use crate::config::Config;
    use crate::database::MockStorage;
    use crate::users::Role;
    use axum::{
        body::Body,
        extract::Extension,
        http::{Request, StatusCode, header::AUTHORIZATION},
        response::Response,
    };
    use tower::ServiceExt;

    fn create_test_app(storage: MockStorage) -> Router {
        Router::new()
            .merge(routes::<MockStorage>())
            .layer(Extension(Config::new_for_test()))
            .with_state(AppState::new(storage))
    }

    fn bearer() -> String {
        let config = Config::new_for_test();
        let token = generate_session_token("admin", config.jwt_secret(), 15).unwrap();
        format!("Bearer {token}")
    }

    fn generate_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate-qr")
            .header("content-type", "application/json")
            .header(AUTHORIZATION, bearer())
            .body(Body::from(body))
            .expect("Failed to create request")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, bearer())
            .body(Body::empty())
            .expect("Failed to create request")
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        serde_json::from_slice(&body).expect("Failed to parse response")
    }

    #[tokio::test]
    async fn test_generate_pin() {
        let storage = MockStorage::new().with_user("alice", "hash", Role::User);

        let response = create_test_app(storage.clone())
            .oneshot(generate_request(r#"{"username": "alice"}"#))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(response).await;
        let pin = body["pin"].as_str().expect("pin should be a string");
        assert_eq!(pin.len(), 6);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));

        let expires_at = body["expires_at"].as_str().expect("expiry should be a string");
        assert!(chrono::DateTime::parse_from_rfc3339(expires_at).is_ok());
        assert_eq!(storage.pin_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_pin_missing_username() {
        let response = create_test_app(MockStorage::new())
            .oneshot(generate_request("{}"))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_pin_unknown_user() {
        let response = create_test_app(MockStorage::new())
            .oneshot(generate_request(r#"{"username": "ghost"}"#))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_pin_requires_token() {
        let request = Request::builder()
            .method("POST")
            .uri("/generate-qr")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "alice"}"#))
            .expect("Failed to create request");

        let response = create_test_app(MockStorage::new())
            .oneshot(request)
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_count_and_reset() {
        let storage = MockStorage::new().with_user("alice", "hash", Role::User);
        for _ in 0..2 {
            let response = create_test_app(storage.clone())
                .oneshot(generate_request(r#"{"username": "alice"}"#))
                .await
                .expect("Failed to get response");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = create_test_app(storage.clone())
            .oneshot(get_request("/user-qr-count/alice"))
            .await
            .expect("Failed to get response");
        let body: PinCountResponse = json_body(response).await;
        assert_eq!(body.count, 2);

        let response = create_test_app(storage.clone())
            .oneshot(get_request("/user-qr-reset/alice"))
            .await
            .expect("Failed to get response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = create_test_app(storage)
            .oneshot(get_request("/user-qr-count/alice"))
            .await
            .expect("Failed to get response");
        let body: PinCountResponse = json_body(response).await;
        assert_eq!(body.count, 0);
    }

    #[tokio::test]
    async fn test_count_for_unknown_user_is_zero() {
        let response = create_test_app(MockStorage::new())
            .oneshot(get_request("/user-qr-count/ghost"))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: PinCountResponse = json_body(response).await;
        assert_eq!(body.count, 0);
    }
}
