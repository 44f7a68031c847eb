//! User directory abstraction.
//!
//! The credential verifier only sees this trait. Production uses the
//! PostgreSQL-backed [`PgUserDirectory`](crate::repository::PgUserDirectory);
//! tests and database-less development use [`InMemoryUserDirectory`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::FromRow;
use tokio::sync::RwLock;

use super::password::{hash_password, PasswordError};

/// A user row as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// Raw role name; parsed by the verifier, unknown names are rejected there
    pub role: String,
    #[sqlx(default)]
    pub owning_document: Option<String>,
    pub active: bool,
    /// Argon2 PHC string
    pub password_hash: String,
}

/// Directory failures. Never shown to callers beyond "service unavailable".
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("directory call timed out after {0:?}")]
    Timeout(Duration),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Read access to user records, plus the last-access bookkeeping.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by exact username. `Ok(None)` when no such user exists.
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Record a successful login.
    async fn record_access(&self, user_id: i64) -> Result<(), DirectoryError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Directory kept in process memory.
///
/// Supports failure injection so the verifier's unavailable paths can be
/// exercised without a database.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    next_id: AtomicU64,
    accesses: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_record_access: AtomicBool,
    lookup_delay_ms: AtomicU64,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, hashing `password`.
    pub fn with_user(
        self,
        username: &str,
        password: &str,
        role: &str,
        owning_document: Option<&str>,
        active: bool,
    ) -> Result<Self, PasswordError> {
        let record = UserRecord {
            id: 0,
            username: username.to_string(),
            role: role.to_string(),
            owning_document: owning_document.map(str::to_string),
            active,
            password_hash: hash_password(password)?,
        };
        Ok(self.with_record(record))
    }

    /// Add a prepared record. Its id is replaced with the next free one.
    pub fn with_record(mut self, mut record: UserRecord) -> Self {
        record.id = self.next_id.fetch_add(1, Ordering::Relaxed) as i64 + 1;
        self.users
            .get_mut()
            .insert(record.username.clone(), record);
        self
    }

    /// Activate or deactivate an existing user. Returns `false` if unknown.
    pub async fn set_active(&self, username: &str, active: bool) -> bool {
        match self.users.write().await.get_mut(username) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        }
    }

    /// Remove a user. Returns `false` if unknown.
    pub async fn remove_user(&self, username: &str) -> bool {
        self.users.write().await.remove(username).is_some()
    }

    /// Make every subsequent lookup fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `record_access` fail.
    pub fn fail_record_access(&self, fail: bool) {
        self.fail_record_access.store(fail, Ordering::SeqCst);
    }

    /// Delay each lookup by `delay`.
    pub fn set_lookup_delay(&self, delay: Duration) {
        self.lookup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful `record_access` calls.
    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let delay = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("lookup failure injected".to_string()));
        }

        Ok(self.users.read().await.get(username).cloned())
    }

    async fn record_access(&self, _user_id: i64) -> Result<(), DirectoryError> {
        if self.fail_record_access.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "record_access failure injected".to_string(),
            ));
        }
        self.accesses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("lookup failure injected".to_string()));
        }
        Ok(())
    }
}
