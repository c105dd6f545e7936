//! Library definitions.
//!
//! Exports the gateway components: session lifecycle, flash channel, rate
//! limiter, access gate, and the request pipeline that composes them.

pub mod auth;
pub mod config;
pub mod core;
pub mod security;
pub mod session;
pub mod web;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use auth::{AuthService, MemoryUserDirectory, UserDirectory};
pub use config::{AppError, Config, Environment, Result};
pub use crate::core::middleware::{
    AccessStage, RateLimitOptions, RateLimitStage, RateLimiter, RoutePolicy,
};
pub use crate::core::{Pipeline, Reply, RequestCtx, ServedReply};
pub use security::{PasswordHasher, TokenSigner};
pub use session::{
    FlashLevel, MemorySessionStore, Principal, RedisSessionStore, Role, SESSION_COOKIE_NAME,
    SessionManager, SessionStore,
};
pub use web::{AppState, build_router};
