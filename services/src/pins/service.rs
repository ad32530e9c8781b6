//! PIN issuance and per-day bookkeeping.
//!
//! Counting and issuing are separate statements and nothing caps how many
//! PINs a user can get per day; the count is informational.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generator::{generate_pin_code, pin_expiry};
use super::storage::{DayWindow, PinStorage};
use crate::database::SqlStorageError;

/// A freshly issued PIN as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedPin {
    pub pin: String,
    pub expires_at: DateTime<Utc>,
}

/// Generates and stores a PIN for `username`, valid from `now`.
///
/// A collision with an existing PIN is reported as
/// [`SqlStorageError::Duplicate`] and not retried.
pub async fn issue_pin<S: PinStorage>(
    storage: &S,
    username: &str,
    now: DateTime<Utc>,
) -> Result<IssuedPin, SqlStorageError> {
    let pin = {
        let mut rng = rand::thread_rng();
        generate_pin_code(&mut rng)
    };
    let expires_at = pin_expiry(now);

    let stored = storage.create_pin(username, &pin, now, expires_at).await?;

    Ok(IssuedPin {
        pin: stored.pin,
        expires_at: stored.expires_at,
    })
}

/// PINs issued to `username` on the server-local day containing `now`.
pub async fn count_for_day<S: PinStorage>(
    storage: &S,
    username: &str,
    now: DateTime<Utc>,
) -> Result<i64, SqlStorageError> {
    storage
        .count_pins(username, DayWindow::containing(now))
        .await
}

/// Removes the PINs issued to `username` on the day containing `now`.
pub async fn reset_for_day<S: PinStorage>(
    storage: &S,
    username: &str,
    now: DateTime<Utc>,
) -> Result<u64, SqlStorageError> {
    storage
        .delete_pins(username, DayWindow::containing(now))
        .await
}
