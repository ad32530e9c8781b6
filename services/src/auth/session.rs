//! Session JWTs and the `RequireAuth` extractor.
//!
//! # Usage
//!
//! ```rust,ignore
//! use zkt_admin_services::auth::RequireAuth;
//!
//! async fn protected_handler(auth: RequireAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", auth.username())
//! }
//! ```
//!
//! # Authentication Flow
//!
//! 1. User logs in via `POST /` and receives a session token
//! 2. Client sends it on later requests as `Authorization: Bearer <token>`
//! 3. `RequireAuth` validates the token and hands the username to the handler
//!
//! # Token Requirements
//!
//! The JWT must:
//! - Be signed with the server's `JWT_SECRET` (HS256)
//! - Have a valid `exp` (expiration) claim
//! - Have a `sub` (subject) claim containing the username
//! - Have an `iss` (issuer) claim matching [`ISSUER`]
//!
//! Tokens carry no role and are never revoked. Deactivating a user does not
//! invalidate tokens that were already issued; they simply run out.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Value of the `iss` claim.
pub const ISSUER: &str = "zkt-admin";

/// Claims of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Issue a signed session token for `username` valid for `ttl_minutes`.
pub fn generate_session_token(
    username: &str,
    jwt_secret: &str,
    ttl_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: username.to_owned(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
        iss: ISSUER.to_owned(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

/// Validate a session token and return its claims.
pub fn validate_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_owned(),
        jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_owned(),
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid token issuer".to_owned(),
        _ => format!("Token validation failed: {e}"),
    })?;

    Ok(token_data.claims)
}

/// Authenticated user context extracted from a valid session token.
///
/// # Rejection
///
/// Returns `SessionAuthError` (401 Unauthorized) if the token is missing,
/// malformed, badly signed, expired or from another issuer.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    claims: SessionClaims,
}

impl RequireAuth {
    /// The authenticated username (from the `sub` claim).
    pub fn username(&self) -> &str {
        &self.claims.sub
    }
}

/// Error type for session authentication failures.
#[derive(Debug, Serialize)]
pub struct SessionAuthError {
    pub error: String,
    pub message: String,
}

impl SessionAuthError {
    fn missing_token() -> Self {
        Self {
            error: "missing_token".to_owned(),
            message: "Authorization header with Bearer token is required".to_owned(),
        }
    }

    fn invalid_format() -> Self {
        Self {
            error: "invalid_format".to_owned(),
            message: "Authorization header must be in format: Bearer <token>".to_owned(),
        }
    }

    fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_owned(),
            message: reason.into(),
        }
    }

    fn missing_config() -> Self {
        Self {
            error: "server_error".to_owned(),
            message: "Server configuration error".to_owned(),
        }
    }
}

impl IntoResponse for SessionAuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_value = headers.get(AUTHORIZATION)?;
    let header_str = header_value.to_str().ok()?;

    let stripped = header_str.strip_prefix("Bearer ")?.trim();
    if stripped.is_empty() {
        return None;
    }
    Some(stripped)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Config>()
            .ok_or_else(SessionAuthError::missing_config)?;

        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            // Distinguish between missing header and invalid format
            if parts.headers.get(AUTHORIZATION).is_some() {
                SessionAuthError::invalid_format()
            } else {
                SessionAuthError::missing_token()
            }
        })?;

        let claims = validate_session_token(token, config.jwt_secret())
            .map_err(SessionAuthError::invalid_token)?;

        tracing::debug!(username = %claims.sub, "Session token accepted");

        Ok(RequireAuth { claims })
    }
}
