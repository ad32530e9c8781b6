//! PostgreSQL connection handling and the storage error taxonomy.
//!
//! Every storage operation acquires one connection from the pool, runs a
//! single statement and hands the connection back. No transaction spans more
//! than one logical operation.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;

use crate::config::Config;

pub mod mock;

pub use mock::MockStorage;

/// Initialize a PostgreSQL connection pool
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new().connect(config.database_url()).await?;

    tracing::info!("Database connection pool established");

    Ok(pool)
}

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        username VARCHAR(20) PRIMARY KEY,
        password VARCHAR(256) NOT NULL,
        role VARCHAR(10) NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const CREATE_LOGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS logs (
        id SERIAL PRIMARY KEY,
        time TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        username VARCHAR(80) NOT NULL,
        type VARCHAR(40),
        message VARCHAR(255)
    )
"#;

const CREATE_PINS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS qr_codes (
        username VARCHAR(20) REFERENCES users(username) ON DELETE CASCADE,
        pin VARCHAR(10) PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        expires_at TIMESTAMPTZ NOT NULL
    )
"#;

/// Postgres `data_type` of a `TIMESTAMPTZ` column.
const TIMESTAMPTZ_TYPE: &str = "timestamp with time zone";

/// Creates the three tables if they do not exist yet.
///
/// This is a bootstrap step, not a migration: existing tables are never
/// altered. PIN `created_at`/`expires_at` are `TIMESTAMPTZ` and the daily
/// count and reset compare them against UTC instants. A `qr_codes` table left
/// over with plain `TIMESTAMP` columns would be read as UTC wall-clock time,
/// so it is reported with a warning at startup.
pub async fn init_schema(pool: &PgPool) -> anyhow::Result<()> {
    for statement in [CREATE_USERS_TABLE, CREATE_LOGS_TABLE, CREATE_PINS_TABLE] {
        sqlx::query(statement).execute(pool).await?;
    }

    let columns: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT column_name::TEXT, data_type::TEXT
        FROM information_schema.columns
        WHERE table_name = 'qr_codes' AND column_name IN ('created_at', 'expires_at')
        "#,
    )
    .fetch_all(pool)
    .await?;

    for column in zoneless_columns(&columns) {
        tracing::warn!(
            table = "qr_codes",
            column = %column,
            "Column is not TIMESTAMPTZ, daily PIN counts may be shifted by the UTC offset"
        );
    }

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Names of the `(column_name, data_type)` pairs not stored as `TIMESTAMPTZ`.
fn zoneless_columns(columns: &[(String, String)]) -> Vec<&str> {
    columns
        .iter()
        .filter(|(_, data_type)| data_type != TIMESTAMPTZ_TYPE)
        .map(|(name, _)| name.as_str())
        .collect()
}

/// Error type shared by all storage operations.
///
/// Connection problems are reported as [`SqlStorageError::Unavailable`] so
/// callers can tell a dead backend apart from a legitimately empty result.
#[derive(Debug, thiserror::Error)]
pub enum SqlStorageError {
    /// A unique constraint rejected the write.
    #[error("{0} already exists")]
    Duplicate(String),

    /// The addressed row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The database could not be reached.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Db(String),
}

impl From<sqlx::Error> for SqlStorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                SqlStorageError::Duplicate("Record".to_owned())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                SqlStorageError::NotFound("Referenced record".to_owned())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => SqlStorageError::Unavailable(err.to_string()),
            _ => SqlStorageError::Db(err.to_string()),
        }
    }
}

/// Database reachability, as reported by the health check.
pub trait SqlStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;
}

/// PostgreSQL-backed storage. The domain storage traits are implemented in
/// their own modules (`users`, `logs`, `pins`).
#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SqlStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
