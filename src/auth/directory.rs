//! User directory abstraction.
//!
//! The gateway only needs lookup and creation; the backing store (a
//! document database in the full deployment) stays behind this trait.

use crate::config::{AppError, Result};
use crate::session::Role;
use async_trait::async_trait;
use papaya::HashMap;

/// One account as the directory stores it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    /// PHC-format Argon2id hash.
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up an account by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Looks up an account by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Creates a new account. Fails if the email is already registered.
    async fn create(&self, record: UserRecord) -> Result<()>;
}

/// In-memory directory for tests and single-process setups.
#[derive(Default)]
pub struct MemoryUserDirectory {
    by_email: HashMap<String, UserRecord>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips an account's active flag. Used to exercise the
    /// deactivated-account paths.
    pub fn set_active(&self, email: &str, active: bool) {
        let by_email = self.by_email.pin();
        if let Some(record) = by_email.get(&email.to_lowercase()) {
            let mut updated = record.clone();
            updated.active = active;
            by_email.insert(updated.email.to_lowercase(), updated);
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self.by_email.pin().get(&email.to_lowercase()).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .by_email
            .pin()
            .iter()
            .find(|(_, record)| record.id == id)
            .map(|(_, record)| record.clone()))
    }

    async fn create(&self, record: UserRecord) -> Result<()> {
        let key = record.email.to_lowercase();
        let by_email = self.by_email.pin();
        if by_email.contains_key(&key) {
            return Err(AppError::Directory(format!(
                "email already registered: {}",
                record.email
            )));
        }
        by_email.insert(key, record);
        Ok(())
    }
}
