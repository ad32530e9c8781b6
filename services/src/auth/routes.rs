use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::service::login;
use super::session::RequireAuth;
use crate::config::Config;
use crate::error::{ApiError, ApiJson};
use crate::state::{AdminStorage, AppState};
use crate::users::Role;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtectedResponse {
    pub logged_in_as: String,
}

/// Creates the router for the login and token-inspection endpoints.
pub fn routes<S: AdminStorage>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(login_info).post(login_handler::<S>))
        .route("/auth/status", get(auth_status))
        .route("/protected", get(protected))
}

async fn login_info() -> Json<MessageResponse> {
    MessageResponse::new("Login endpoint")
}

/// Handler for `POST /`.
///
/// # Request
///
/// ```json
/// { "username": "alice", "password": "pw123" }
/// ```
///
/// # Response
///
/// ```json
/// {
///     "message": "Login successful",
///     "token": "eyJ...",
///     "username": "alice",
///     "role": "admin"
/// }
/// ```
#[tracing::instrument(skip_all, fields(username = %payload.username))]
async fn login_handler<S: AdminStorage>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let outcome = login(&state.storage, &config, &payload.username, &payload.password).await?;
    tracing::info!("Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful".to_owned(),
        token: outcome.token,
        username: outcome.username,
        role: outcome.role,
    }))
}

async fn auth_status(auth: RequireAuth) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: true,
        user: auth.username().to_owned(),
    })
}

async fn protected(auth: RequireAuth) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        logged_in_as: auth.username().to_owned(),
    })
}
