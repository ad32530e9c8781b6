//! User storage trait and its PostgreSQL implementation.
//!
//! # Architecture
//!
//! The module follows the repository pattern with trait-based abstraction:
//! - `UserStorage` trait: interface for user account operations
//! - `PgStorage` implements it against the `users` table
//! - `MockStorage` (see `crate::database::mock`) implements it in memory for tests
//!
//! Passwords reach this layer already hashed; storage never sees plaintext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;

use crate::database::{PgStorage, SqlStorageError};

/// Maximum username length, matching the `VARCHAR(20)` column.
pub const MAX_USERNAME_LEN: usize = 20;

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// A user row including the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    /// Creates a new active `StoredUser` stamped with the current time.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            role: self.role,
            active: self.active,
        }
    }
}

/// The public projection of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
    pub active: bool,
}

/// Trait for user storage operations.
///
/// Every method maps to exactly one SQL statement. Mutations that address a
/// missing user fail with [`SqlStorageError::NotFound`].
pub trait UserStorage: Clone + Send + Sync + 'static {
    /// Creates a new active user.
    ///
    /// Fails with [`SqlStorageError::Duplicate`] when the username is taken;
    /// nothing is written in that case.
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> impl Future<Output = Result<StoredUser, SqlStorageError>> + Send;

    /// Retrieves an **active** user by username.
    fn get_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, SqlStorageError>> + Send;

    /// Lists every user, active or not, ordered by username.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserSummary>, SqlStorageError>> + Send;

    fn set_user_active(
        &self,
        username: &str,
        active: bool,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    /// Flips the `active` flag and returns the new value.
    fn toggle_user_active(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// Replaces the password hash in place.
    fn set_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    /// Hard-deletes a user. Their PINs go with them; log entries stay.
    fn delete_user(&self, username: &str)
    -> impl Future<Output = Result<(), SqlStorageError>> + Send;
}

/// Row type for user queries with all fields.
#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password: String,
    role: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for StoredUser {
    type Error = SqlStorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e: UnknownRole| SqlStorageError::Db(e.to_string()))?;
        Ok(StoredUser {
            username: row.username,
            password_hash: row.password,
            role,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    username: String,
    role: String,
    active: bool,
}

fn user_not_found(username: &str) -> SqlStorageError {
    SqlStorageError::NotFound(format!("User {username}"))
}

impl UserStorage for PgStorage {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<StoredUser, SqlStorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING username, password, role, active, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(SqlStorageError::Duplicate("Username".to_owned())),
        }
    }

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, SqlStorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT username, password, role, active, created_at
            FROM users
            WHERE username = $1 AND active = TRUE
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredUser::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, SqlStorageError> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            "SELECT username, role, active FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role = row
                    .role
                    .parse()
                    .map_err(|e: UnknownRole| SqlStorageError::Db(e.to_string()))?;
                Ok(UserSummary {
                    username: row.username,
                    role,
                    active: row.active,
                })
            })
            .collect()
    }

    async fn set_user_active(&self, username: &str, active: bool) -> Result<(), SqlStorageError> {
        let result = sqlx::query("UPDATE users SET active = $2 WHERE username = $1")
            .bind(username)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(username));
        }
        Ok(())
    }

    async fn toggle_user_active(&self, username: &str) -> Result<bool, SqlStorageError> {
        let active = sqlx::query_scalar::<_, bool>(
            "UPDATE users SET active = NOT active WHERE username = $1 RETURNING active",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        active.ok_or_else(|| user_not_found(username))
    }

    async fn set_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), SqlStorageError> {
        let result = sqlx::query("UPDATE users SET password = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(username));
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), SqlStorageError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(username));
        }
        Ok(())
    }
}
