//! HTTP error taxonomy.
//!
//! Handlers return `Result<_, ApiError>`. Every error renders as
//! `{"error": <kind>, "message": <text>}` with the matching status code.
//!
//! Internal and unavailable errors carry a generic message on the wire. The
//! raw detail rides along as an [`ErrorDetail`] response extension, and the
//! [`expose_error_details`] middleware swaps it into the body only in
//! environments that allow it (`local`, `test`).

use axum::{
    Json,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::any::Any;

use crate::config::Config;
use crate::database::SqlStorageError;

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";
const GENERIC_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind used in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unprocessable(_) => "unprocessable_entity",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        ApiError::Unprocessable(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

/// The unredacted message of an internal or unavailable error.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let (public_message, detail) = match self {
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (GENERIC_INTERNAL_MESSAGE.to_owned(), Some(msg))
            }
            ApiError::Unavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (GENERIC_UNAVAILABLE_MESSAGE.to_owned(), Some(msg))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            error: kind.to_owned(),
            message: public_message,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(message) = detail {
            response
                .extensions_mut()
                .insert(ErrorDetail { kind, message });
        }
        response
    }
}

impl From<SqlStorageError> for ApiError {
    fn from(err: SqlStorageError) -> Self {
        match err {
            SqlStorageError::Duplicate(_) => ApiError::Conflict(err.to_string()),
            SqlStorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SqlStorageError::Unavailable(_) => ApiError::Unavailable(err.to_string()),
            SqlStorageError::Db(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejections are rendered as [`ApiError::BadRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Middleware that puts the raw detail of internal errors back into the body
/// when the environment allows it.
pub async fn expose_error_details(
    State(config): State<Config>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !config.exposes_error_details() {
        return response;
    }

    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let body = ErrorResponse {
        error: detail.kind.to_owned(),
        message: detail.message,
    };
    (response.status(), Json(body)).into_response()
}

/// Renders a handler panic as an internal error.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "Unknown panic message".to_owned()
    };

    ApiError::Internal(format!("Handler panicked: {detail}")).into_response()
}
