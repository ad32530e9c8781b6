//! Audit log endpoints. All of them require a session token.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use serde::Deserialize;

use super::storage::{
    LogEntry, LogStorage, MAX_LOG_MESSAGE_LEN, MAX_LOG_TYPE_LEN, MAX_LOG_USERNAME_LEN,
};
use crate::auth::{MessageResponse, RequireAuth};
use crate::error::{ApiError, ApiJson};
use crate::state::{AdminStorage, AppState};

/// Body of `POST /logs`. Fields are checked by hand so that a missing field
/// is a 422 rather than a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct NewLogRequest {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub message: Option<String>,
    pub user: Option<String>,
}

/// Creates the router for audit log endpoints.
pub fn routes<S: AdminStorage>() -> Router<AppState<S>> {
    Router::new()
        .route("/logs", get(list_logs::<S>).post(add_log::<S>))
        .route("/clear-logs", delete(clear_logs::<S>))
}

fn required_field<'a>(
    name: &str,
    value: Option<&'a str>,
    max_len: usize,
) -> Result<&'a str, ApiError> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unprocessable(format!("Missing required field: {name}")))?;

    if value.chars().count() > max_len {
        return Err(ApiError::unprocessable(format!(
            "Field {name} exceeds {max_len} characters"
        )));
    }
    Ok(value)
}

#[tracing::instrument(skip_all, fields(actor = %auth.username()))]
async fn list_logs<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let logs = state.storage.list_logs().await?;
    Ok(Json(logs))
}

#[tracing::instrument(skip_all, fields(actor = %auth.username()))]
async fn add_log<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
    ApiJson(payload): ApiJson<NewLogRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let log_type = required_field("type", payload.log_type.as_deref(), MAX_LOG_TYPE_LEN)?;
    let message = required_field("message", payload.message.as_deref(), MAX_LOG_MESSAGE_LEN)?;
    let user = required_field("user", payload.user.as_deref(), MAX_LOG_USERNAME_LEN)?;

    let entry = state.storage.append_log(user, log_type, message).await?;
    tracing::info!(log_id = entry.id, user = %user, log_type = %log_type, "Log entry added");

    Ok(MessageResponse::new("Log added"))
}

#[tracing::instrument(skip_all, fields(actor = %auth.username()))]
async fn clear_logs<S: AdminStorage>(
    auth: RequireAuth,
    State(state): State<AppState<S>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.storage.clear_logs().await?;
    tracing::warn!(removed, "Audit log cleared");

    Ok(MessageResponse::new("Logs have been deleted!"))
}
