//! Redis-backed session store.
//!
//! Sessions are stored as JSON under a prefixed key with a server-side TTL,
//! so expiry needs no application-side sweep.

use crate::config::{AppError, Result};
use crate::session::data::SessionData;
use crate::session::store::SessionStore;
use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use std::time::Duration;

const KEY_PREFIX: &str = "collars:sess:";

pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    /// Connects to the store and verifies the initial connection.
    ///
    /// Request-time failures after this point degrade to anonymous; only
    /// startup refuses to proceed without a reachable store.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial connection
    /// cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(5))
            .set_response_timeout(Duration::from_secs(45));

        let client = Client::open(url).map_err(|e| AppError::SessionStore(e.to_string()))?;
        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))?;

        Ok(Self { conn })
    }

    fn key(token: &str) -> String {
        format!("{KEY_PREFIX}{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::key(token))
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AppError::SessionStore(format!("corrupt session payload: {e}"))),
            None => Ok(None),
        }
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()> {
        let json =
            serde_json::to_string(data).map_err(|e| AppError::SessionStore(e.to_string()))?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key(token), json, ttl.as_secs())
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::key(token))
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))
    }
}
