//! Audit log storage.
//!
//! Log entries reference users by name only; deleting a user leaves their
//! entries in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::database::{PgStorage, SqlStorageError};

/// Column limits of the `logs` table.
pub const MAX_LOG_USERNAME_LEN: usize = 80;
pub const MAX_LOG_TYPE_LEN: usize = 40;
pub const MAX_LOG_MESSAGE_LEN: usize = 255;

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i32,
    pub time: DateTime<Utc>,
    pub username: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub log_type: Option<String>,
    pub message: Option<String>,
}

pub trait LogStorage: Clone + Send + Sync + 'static {
    /// All entries, newest first.
    fn list_logs(&self) -> impl Future<Output = Result<Vec<LogEntry>, SqlStorageError>> + Send;

    fn append_log(
        &self,
        username: &str,
        log_type: &str,
        message: &str,
    ) -> impl Future<Output = Result<LogEntry, SqlStorageError>> + Send;

    /// Deletes every entry and returns how many were removed.
    fn clear_logs(&self) -> impl Future<Output = Result<u64, SqlStorageError>> + Send;
}

impl LogStorage for PgStorage {
    async fn list_logs(&self) -> Result<Vec<LogEntry>, SqlStorageError> {
        let rows = sqlx::query_as::<_, LogEntry>(
            "SELECT id, time, username, type, message FROM logs ORDER BY time DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn append_log(
        &self,
        username: &str,
        log_type: &str,
        message: &str,
    ) -> Result<LogEntry, SqlStorageError> {
        let row = sqlx::query_as::<_, LogEntry>(
            r#"
            INSERT INTO logs (username, type, message)
            VALUES ($1, $2, $3)
            RETURNING id, time, username, type, message
            "#,
        )
        .bind(username)
        .bind(log_type)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn clear_logs(&self) -> Result<u64, SqlStorageError> {
        let result = sqlx::query("DELETE FROM logs").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_type_field() {
        let entry = LogEntry {
            id: 7,
            time: DateTime::parse_from_rfc3339("2026-10-15T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            username: "alice".to_owned(),
            log_type: Some("door".to_owned()),
            message: Some("opened".to_owned()),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "door");
        assert_eq!(json["message"], "opened");
        assert_eq!(json["time"], "2026-10-15T08:30:00Z");
        assert!(json.get("log_type").is_none());
    }
}
