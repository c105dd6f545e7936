//! Configuration settings.
//!
//! Defines the main `Config` struct and environment variable loading logic.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

/// Deployment environment.
///
/// Controls the cookie `Secure` flag and how much error detail is exposed
/// to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set in environment"))
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_u32_or(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn get_env_u64_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub listen_addr: SocketAddr,
    /// Deployment environment.
    pub environment: Environment,
    /// Session store URL (redis://...).
    pub session_store_url: String,
    /// Secret key for session cookie signing.
    pub session_secret: String,
    /// Session lifetime in seconds, sliding on each touch.
    pub session_ttl_secs: u64,
    /// Tolerance window for coalescing session touch writes, in seconds.
    pub session_touch_secs: u64,
    /// Sign-in rate limit window in seconds.
    pub signin_rate_window_secs: u64,
    /// Maximum sign-in requests per client within one window.
    pub signin_rate_max: u32,
    /// Interval between rate-limit record sweeps, in seconds.
    pub rate_sweep_interval_secs: u64,
    /// Application name for page titles and log context.
    pub app_name: String,
    /// Logging format: "json" or "pretty".
    pub log_format: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if `SESSION_STORE_URL` or `SESSION_SECRET` is missing, or if
    /// `LISTEN_ADDR` is not a valid socket address.
    #[must_use]
    pub fn from_env() -> Arc<Self> {
        let listen_addr = get_env_or("LISTEN_ADDR", "0.0.0.0:3000")
            .parse()
            .expect("LISTEN_ADDR must be a valid socket address");
        let environment = Environment::from_str(&get_env_or("APP_ENV", "development"));
        let session_store_url = get_env("SESSION_STORE_URL");
        let session_secret = get_env("SESSION_SECRET");

        Arc::new(Self {
            listen_addr,
            environment,
            session_store_url,
            session_secret,
            session_ttl_secs: get_env_u64_or("SESSION_TTL_SECS", 7 * 24 * 3600),
            session_touch_secs: get_env_u64_or("SESSION_TOUCH_SECS", 24 * 3600),
            signin_rate_window_secs: get_env_u64_or("SIGNIN_RATE_WINDOW_SECS", 15 * 60),
            signin_rate_max: get_env_u32_or("SIGNIN_RATE_MAX", 100),
            rate_sweep_interval_secs: get_env_u64_or("RATE_SWEEP_INTERVAL_SECS", 3600),
            app_name: get_env_or("APP_NAME", "White Collars"),
            log_format: get_env_or("LOG_FORMAT", "json"),
        })
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }
}
