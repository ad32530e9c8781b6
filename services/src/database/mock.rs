//! In-memory storage for unit and integration tests.
//!
//! All three tables live behind one lock so that deleting a user can cascade
//! to their PINs exactly like the `ON DELETE CASCADE` foreign key does.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{SqlStorage, SqlStorageError};
use crate::logs::{LogEntry, LogStorage};
use crate::pins::{DayWindow, OneTimePin, PinStorage};
use crate::users::{Role, StoredUser, UserStorage, UserSummary};

#[derive(Default)]
struct MockTables {
    users: BTreeMap<String, StoredUser>,
    logs: Vec<LogEntry>,
    next_log_id: i32,
    pins: Vec<OneTimePin>,
}

/// In-memory implementation of every storage trait.
///
/// Clones share the same tables. A storage built with
/// [`MockStorage::disconnected`] fails every call with
/// [`SqlStorageError::Unavailable`].
///
/// # Example
///
/// ```
/// use zkt_admin_services::database::MockStorage;
/// use zkt_admin_services::users::Role;
///
/// let storage = MockStorage::new().with_user("alice", "$argon2id$...", Role::Admin);
/// assert_eq!(storage.user_count(), 1);
/// ```
#[derive(Clone)]
pub struct MockStorage {
    tables: Arc<RwLock<MockTables>>,
    is_connected: bool,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(MockTables {
                next_log_id: 1,
                ..MockTables::default()
            })),
            is_connected: true,
        }
    }

    /// Creates a storage that behaves like an unreachable database.
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            ..Self::new()
        }
    }

    /// Inserts an active user (builder pattern).
    pub fn with_user(self, username: &str, password_hash: &str, role: Role) -> Self {
        let user = StoredUser::new(username, password_hash, role);
        self.write().users.insert(username.to_owned(), user);
        self
    }

    /// Inserts a PIN row as-is (builder pattern), bypassing the user check.
    pub fn with_pin(self, pin: OneTimePin) -> Self {
        self.write().pins.push(pin);
        self
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    pub fn pin_count(&self) -> usize {
        self.read().pins.len()
    }

    /// Returns the stored row regardless of its `active` flag.
    pub fn stored_user(&self, username: &str) -> Option<StoredUser> {
        self.read().users.get(username).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockTables> {
        self.tables.read().expect("lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockTables> {
        self.tables.write().expect("lock poisoned")
    }

    fn ensure_connected(&self) -> Result<(), SqlStorageError> {
        if self.is_connected {
            Ok(())
        } else {
            Err(SqlStorageError::Unavailable(
                "MockStorage is disconnected".to_owned(),
            ))
        }
    }
}

fn user_not_found(username: &str) -> SqlStorageError {
    SqlStorageError::NotFound(format!("User {username}"))
}

impl SqlStorage for MockStorage {
    async fn is_connected(&self) -> bool {
        self.is_connected
    }
}

impl UserStorage for MockStorage {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<StoredUser, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();

        if tables.users.contains_key(username) {
            return Err(SqlStorageError::Duplicate("Username".to_owned()));
        }

        let user = StoredUser::new(username, password_hash, role);
        tables.users.insert(username.to_owned(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, SqlStorageError> {
        self.ensure_connected()?;
        Ok(self
            .read()
            .users
            .get(username)
            .filter(|user| user.active)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, SqlStorageError> {
        self.ensure_connected()?;
        Ok(self.read().users.values().map(StoredUser::summary).collect())
    }

    async fn set_user_active(&self, username: &str, active: bool) -> Result<(), SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let user = tables
            .users
            .get_mut(username)
            .ok_or_else(|| user_not_found(username))?;
        user.active = active;
        Ok(())
    }

    async fn toggle_user_active(&self, username: &str) -> Result<bool, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let user = tables
            .users
            .get_mut(username)
            .ok_or_else(|| user_not_found(username))?;
        user.active = !user.active;
        Ok(user.active)
    }

    async fn set_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let user = tables
            .users
            .get_mut(username)
            .ok_or_else(|| user_not_found(username))?;
        password_hash.clone_into(&mut user.password_hash);
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        if tables.users.remove(username).is_none() {
            return Err(user_not_found(username));
        }
        tables.pins.retain(|pin| pin.username != username);
        Ok(())
    }
}

impl LogStorage for MockStorage {
    async fn list_logs(&self) -> Result<Vec<LogEntry>, SqlStorageError> {
        self.ensure_connected()?;
        let mut logs = self.read().logs.clone();
        logs.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn append_log(
        &self,
        username: &str,
        log_type: &str,
        message: &str,
    ) -> Result<LogEntry, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let entry = LogEntry {
            id: tables.next_log_id,
            time: Utc::now(),
            username: username.to_owned(),
            log_type: Some(log_type.to_owned()),
            message: Some(message.to_owned()),
        };
        tables.next_log_id += 1;
        tables.logs.push(entry.clone());
        Ok(entry)
    }

    async fn clear_logs(&self) -> Result<u64, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let removed = tables.logs.len() as u64;
        tables.logs.clear();
        Ok(removed)
    }
}

impl PinStorage for MockStorage {
    async fn create_pin(
        &self,
        username: &str,
        pin: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimePin, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();

        if !tables.users.contains_key(username) {
            return Err(user_not_found(username));
        }
        if tables.pins.iter().any(|existing| existing.pin == pin) {
            return Err(SqlStorageError::Duplicate("PIN".to_owned()));
        }

        let row = OneTimePin {
            username: username.to_owned(),
            pin: pin.to_owned(),
            created_at,
            expires_at,
        };
        tables.pins.push(row.clone());
        Ok(row)
    }

    async fn count_pins(&self, username: &str, day: DayWindow) -> Result<i64, SqlStorageError> {
        self.ensure_connected()?;
        let count = self
            .read()
            .pins
            .iter()
            .filter(|pin| pin.username == username && day.contains(pin.created_at))
            .count();
        Ok(count as i64)
    }

    async fn delete_pins(&self, username: &str, day: DayWindow) -> Result<u64, SqlStorageError> {
        self.ensure_connected()?;
        let mut tables = self.write();
        let before = tables.pins.len();
        tables
            .pins
            .retain(|pin| !(pin.username == username && day.contains(pin.created_at)));
        Ok((before - tables.pins.len()) as u64)
    }
}
