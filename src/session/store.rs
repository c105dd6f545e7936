//! Session store abstraction and lifecycle management.
//!
//! The store itself is a dumb token-to-data mapping with TTL expiry; the
//! `SessionManager` on top implements the lifecycle contract: soft-failing
//! resolution, lazy token minting, coalesced touch writes, and idempotent
//! destruction.
//!
//! Concurrent requests for the same session race last-write-wins on the
//! store: one request's drain can clobber another in-flight request's
//! still-pending enqueue. That matches the upstream design and is accepted;
//! nothing here attempts cross-request serialization.

use crate::config::{Config, Result};
use crate::security::TokenSigner;
use crate::session::data::SessionData;
use crate::session::token::{
    SESSION_COOKIE_NAME, cookie_value, format_expired_cookie, format_set_cookie,
    generate_session_token,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Token-keyed session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the session for `token`, or `None` if absent or expired.
    async fn load(&self, token: &str) -> Result<Option<SessionData>>;

    /// Writes the session under `token` with the given time-to-live.
    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()>;

    /// Removes the session for `token`. Removing an absent token is not an
    /// error.
    async fn delete(&self, token: &str) -> Result<()>;
}

/// Gives every request a stable identity across the request/response
/// boundary.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    signer: TokenSigner,
    ttl: Duration,
    touch_after: Duration,
    secure_cookies: bool,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: &Config) -> Self {
        Self::with_options(
            store,
            &config.session_secret,
            Duration::from_secs(config.session_ttl_secs),
            Duration::from_secs(config.session_touch_secs),
            config.secure_cookies(),
        )
    }

    #[must_use]
    pub fn with_options(
        store: Arc<dyn SessionStore>,
        secret: &str,
        ttl: Duration,
        touch_after: Duration,
        secure_cookies: bool,
    ) -> Self {
        Self {
            store,
            signer: TokenSigner::new(secret),
            ttl,
            touch_after,
            secure_cookies,
        }
    }

    /// Resolves a request's `Cookie` header to its session.
    ///
    /// Missing, unsigned, tampered, unknown, and expired tokens all resolve
    /// to anonymous. A store failure is logged and likewise resolves to
    /// anonymous; it never fails the request.
    pub async fn resolve(
        &self,
        cookie_header: Option<&str>,
    ) -> (Option<String>, Option<SessionData>) {
        let Some(token) = cookie_header
            .and_then(|header| cookie_value(header, SESSION_COOKIE_NAME))
            .and_then(|value| self.signer.verify(value))
        else {
            return (None, None);
        };

        match self.store.load(&token).await {
            Ok(Some(data)) => {
                let idle = now_secs().saturating_sub(data.last_touched_at);
                if idle > self.ttl.as_secs() {
                    debug!(idle_secs = idle, "Session expired, discarding");
                    self.destroy(&token).await;
                    return (None, None);
                }
                (Some(token), Some(data))
            }
            Ok(None) => (None, None),
            Err(e) => {
                warn!(error = %e, "Session store unavailable, treating request as anonymous");
                (None, None)
            }
        }
    }

    /// Persists end-of-request session state and returns the `Set-Cookie`
    /// header to send, if any.
    ///
    /// A token is minted on the first write; sessions with nothing worth
    /// keeping are never written. For an existing, unmodified session the
    /// write is coalesced: the store is only touched when the last-touched
    /// timestamp has aged past the touch tolerance.
    pub async fn persist(
        &self,
        token: Option<&str>,
        session: Option<&SessionData>,
        dirty: bool,
        destroyed: bool,
    ) -> Option<String> {
        if destroyed {
            if let Some(token) = token {
                self.destroy(token).await;
            }
            return Some(format_expired_cookie(SESSION_COOKIE_NAME, self.secure_cookies));
        }

        let session = session?;
        let now = now_secs();

        match token {
            None => {
                if session.is_unused() {
                    return None;
                }

                let token = generate_session_token();
                let mut data = session.clone();
                data.last_touched_at = now;
                if let Err(e) = self.store.save(&token, &data, self.ttl).await {
                    warn!(error = %e, "Failed to persist new session");
                    return None;
                }
                Some(self.set_cookie(&token))
            }
            Some(token) => {
                let needs_touch =
                    now.saturating_sub(session.last_touched_at) > self.touch_after.as_secs();
                if !dirty && !needs_touch {
                    return None;
                }

                let mut data = session.clone();
                data.last_touched_at = now;
                if let Err(e) = self.store.save(token, &data, self.ttl).await {
                    warn!(error = %e, "Failed to persist session");
                    return None;
                }
                Some(self.set_cookie(token))
            }
        }
    }

    /// Removes all state for `token`. Idempotent; a store failure is logged
    /// and the enclosing request proceeds as anonymous.
    pub async fn destroy(&self, token: &str) {
        if let Err(e) = self.store.delete(token).await {
            warn!(error = %e, "Failed to destroy session, proceeding as anonymous");
        }
    }

    fn set_cookie(&self, token: &str) -> String {
        format_set_cookie(
            SESSION_COOKIE_NAME,
            &self.signer.sign(token),
            self.ttl.as_secs(),
            self.secure_cookies,
        )
    }

    /// Signed cookie value for `token`. Used by tests to forge clients.
    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn signed_value(&self, token: &str) -> String {
        self.signer.sign(token)
    }
}
