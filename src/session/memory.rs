//! In-memory session store.
//!
//! Used in tests and single-process development setups; production deploys
//! point at Redis.

use crate::config::Result;
use crate::session::data::SessionData;
use crate::session::store::{SessionStore, now_secs};
use async_trait::async_trait;
use papaya::HashMap;
use std::time::Duration;

struct Entry {
    data: SessionData,
    expires_at: u64,
}

#[derive(Default)]
pub struct MemorySessionStore {
    entries: HashMap<String, Entry>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.pin().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries whose TTL has passed, returning how many were evicted.
    pub fn cleanup_expired(&self) -> usize {
        let now = now_secs();
        let entries = self.entries.pin();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(token, _)| token.clone())
            .collect();

        for token in &stale {
            entries.remove(token);
        }
        stale.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>> {
        let entries = self.entries.pin();
        match entries.get(token) {
            Some(entry) if now_secs() <= entry.expires_at => Ok(Some(entry.data.clone())),
            Some(_) => {
                entries.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()> {
        self.entries.pin().insert(
            token.to_string(),
            Entry {
                data: data.clone(),
                expires_at: now_secs() + ttl.as_secs(),
            },
        );
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.entries.pin().remove(token);
        Ok(())
    }
}
