//! Credential check and token issuance.

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::session::generate_session_token;
use crate::config::Config;
use crate::database::SqlStorageError;
use crate::error::ApiError;
use crate::users::{Role, UserStorage};

/// Placeholder verified against when the user does not exist, so a login for
/// an unknown name costs about as much as one with a wrong password.
const DUMMY_PASSWORD: &str = "zkt-admin-dummy-password";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Unknown user, deactivated user or wrong password. Deliberately not
    /// distinguished.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] SqlStorageError),

    #[error("{0}")]
    Internal(String),
}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            LoginError::Storage(e) => e.into(),
            LoginError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Check `username`/`password` against the stored hash and issue a token.
///
/// Only active users can log in.
pub async fn login<S: UserStorage>(
    storage: &S,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, LoginError> {
    let Some(user) = storage.get_user(username).await? else {
        // Only the elapsed time matters here, the hash itself is discarded
        let _ = hash_password_blocking(DUMMY_PASSWORD.to_owned()).await;
        tracing::info!("Login rejected: no active user");
        return Err(LoginError::InvalidCredentials);
    };

    let matches = verify_password_blocking(password.to_owned(), user.password_hash.clone())
        .await
        .map_err(|e| LoginError::Internal(format!("{e:#}")))?;
    if !matches {
        tracing::info!("Login rejected: password mismatch");
        return Err(LoginError::InvalidCredentials);
    }

    let token = generate_session_token(
        &user.username,
        config.jwt_secret(),
        config.token_ttl_minutes(),
    )
    .map_err(|e| LoginError::Internal(format!("Failed to sign session token: {e}")))?;

    Ok(LoginOutcome {
        token,
        username: user.username,
        role: user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::auth::session::validate_session_token;
    use crate::database::MockStorage;

    fn storage_with_alice() -> MockStorage {
        let hash = hash_password("pw123").expect("hashing should succeed");
        MockStorage::new().with_user("alice", &hash, Role::Admin)
    }

    #[tokio::test]
    async fn test_login_success_issues_token_for_user() {
        let storage = storage_with_alice();
        let config = Config::new_for_test();

        let outcome = login(&storage, &config, "alice", "pw123")
            .await
            .expect("login should succeed");

        assert_eq!(outcome.username, "alice");
        assert_eq!(outcome.role, Role::Admin);

        let claims = validate_session_token(&outcome.token, config.jwt_secret()).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let storage = storage_with_alice();
        let config = Config::new_for_test();

        let result = login(&storage, &config, "alice", "wrong").await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let storage = MockStorage::new();
        let config = Config::new_for_test();

        let result = login(&storage, &config, "ghost", "pw123").await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_deactivated_user() {
        let storage = storage_with_alice();
        storage.set_user_active("alice", false).await.unwrap();
        let config = Config::new_for_test();

        let result = login(&storage, &config, "alice", "pw123").await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_storage_down() {
        let storage = MockStorage::disconnected();
        let config = Config::new_for_test();

        let result = login(&storage, &config, "alice", "pw123").await;
        assert!(matches!(
            result,
            Err(LoginError::Storage(SqlStorageError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_login_error_maps_to_api_error() {
        let err: ApiError = LoginError::InvalidCredentials.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err: ApiError = LoginError::Internal("boom".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
