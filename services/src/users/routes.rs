//! User account endpoints.
//!
//! Listing, registration, activation and password reset are open; deletion
//! requires a session token.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use super::storage::{MAX_USERNAME_LEN, Role, UserSummary};
use crate::auth::password::hash_password_blocking;
use crate::auth::{MessageResponse, RequireAuth};
use crate::database::SqlStorageError;
use crate::error::{ApiError, ApiJson};
use crate::state::{AdminStorage, AppState};

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetActiveResponse {
    pub message: String,
    pub username: String,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Creates the router for user account endpoints.
pub fn routes<S: AdminStorage>() -> Router<AppState<S>> {
    Router::new()
        .route("/users", get(list_users::<S>))
        .route("/add_user", post(add_user::<S>))
        .route("/users/{username}/activate", post(set_active::<S>))
        .route("/users/{username}/reset-password", post(reset_password::<S>))
        .route("/users/{username}", delete(delete_user::<S>))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn list_users<S: AdminStorage>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.storage.list_users().await?;
    tracing::debug!(count = users.len(), "Listed users");
    Ok(Json(users))
}

/// Handler for `POST /add_user`.
///
/// ```json
/// { "username": "alice", "password": "pw123", "role": "admin" }
/// ```
///
/// `role` defaults to `user`. Responds `201 Created`.
#[tracing::instrument(skip_all, fields(username = %payload.username))]
async fn add_user<S: AdminStorage>(
    State(state): State<AppState<S>>,
    ApiJson(payload): ApiJson<AddUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_username(&payload.username)?;
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    let role = match payload.role.as_deref() {
        None => Role::default(),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
    };

    let password_hash = hash_password_blocking(payload.password).await?;

    match state
        .storage
        .create_user(&payload.username, &password_hash, role)
        .await
    {
        Ok(_) => {
            tracing::info!(role = %role, "User created");
            Ok((
                StatusCode::CREATED,
                MessageResponse::new(format!("User {} added successfully", payload.username)),
            ))
        }
        Err(SqlStorageError::Duplicate(_)) => {
            tracing::warn!("Username already taken");
            Err(ApiError::bad_request("Username already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Handler for `POST /users/{username}/activate`.
///
/// With a `{"active": bool}` body the flag is set; with an empty body it is
/// flipped.
#[tracing::instrument(skip_all, fields(username = %username))]
async fn set_active<S: AdminStorage>(
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
    body: Bytes,
) -> Result<Json<SetActiveResponse>, ApiError> {
    let active = if body.iter().all(u8::is_ascii_whitespace) {
        state.storage.toggle_user_active(&username).await?
    } else {
        let request: SetActiveRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?;
        state
            .storage
            .set_user_active(&username, request.active)
            .await?;
        request.active
    };

    tracing::info!(active, "User activation changed");

    let verb = if active { "activated" } else { "deactivated" };
    Ok(Json(SetActiveResponse {
        message: format!("User {username} {verb}"),
        username,
        active,
    }))
}

#[tracing::instrument(skip_all, fields(username = %username))]
async fn reset_password<S: AdminStorage>(
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    state.storage.set_password(&username, &password_hash).await?;
    tracing::info!("Password reset");

    Ok(MessageResponse::new(format!(
        "Password for {username} reset successfully"
    )))
}

#[tracing::instrument(skip_all, fields(username = %username, actor = %auth.username()))]
async fn delete_user<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.storage.delete_user(&username).await?;
    tracing::info!("User deleted");

    Ok(MessageResponse::new(format!(
        "User {username} deleted successfully"
    )))
}
