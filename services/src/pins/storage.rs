//! One-time PIN storage.
//!
//! Rows live in the `qr_codes` table. Nothing sweeps expired rows; they stay
//! until a same-day reset removes them or their user is deleted.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::future::Future;

use crate::database::{PgStorage, SqlStorageError};

/// A persisted PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OneTimePin {
    pub username: String,
    pub pin: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A server-local calendar day expressed as a half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The server-local calendar day that contains `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let date = instant.with_timezone(&Local).date_naive();
        let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        Self {
            start: local_midnight(date),
            end: local_midnight(next),
        }
    }

    pub fn today() -> Self {
        Self::containing(Utc::now())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    // Midnight can be skipped by a DST jump; fall back to reading it as UTC.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub trait PinStorage: Clone + Send + Sync + 'static {
    /// Persists a PIN for an existing user.
    ///
    /// Fails with [`SqlStorageError::NotFound`] for an unknown user and with
    /// [`SqlStorageError::Duplicate`] when the PIN value is already taken.
    fn create_pin(
        &self,
        username: &str,
        pin: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<OneTimePin, SqlStorageError>> + Send;

    /// Counts PINs created for `username` inside `day`.
    fn count_pins(
        &self,
        username: &str,
        day: DayWindow,
    ) -> impl Future<Output = Result<i64, SqlStorageError>> + Send;

    /// Deletes PINs created for `username` inside `day`, returning how many went.
    fn delete_pins(
        &self,
        username: &str,
        day: DayWindow,
    ) -> impl Future<Output = Result<u64, SqlStorageError>> + Send;
}

impl PinStorage for PgStorage {
    async fn create_pin(
        &self,
        username: &str,
        pin: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimePin, SqlStorageError> {
        sqlx::query_as::<_, OneTimePin>(
            r#"
            INSERT INTO qr_codes (username, pin, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING username, pin, created_at, expires_at
            "#,
        )
        .bind(username)
        .bind(pin)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match SqlStorageError::from(e) {
            SqlStorageError::Duplicate(_) => SqlStorageError::Duplicate("PIN".to_owned()),
            SqlStorageError::NotFound(_) => SqlStorageError::NotFound(format!("User {username}")),
            other => other,
        })
    }

    async fn count_pins(&self, username: &str, day: DayWindow) -> Result<i64, SqlStorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM qr_codes
            WHERE username = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(username)
        .bind(day.start)
        .bind(day.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn delete_pins(&self, username: &str, day: DayWindow) -> Result<u64, SqlStorageError> {
        let result = sqlx::query(
            r#"
            DELETE FROM qr_codes
            WHERE username = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(username)
        .bind(day.start)
        .bind(day.end)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
