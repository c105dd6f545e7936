//! Test utilities and shared configuration.
//!
//! This module provides common helpers for unit and integration tests,
//! reducing duplication across the codebase.

#[cfg(any(test, feature = "testing"))]
use crate::config::{Config, Environment};
#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;

/// Creates a standard configuration for testing purposes.
///
/// This configuration has:
/// - An ephemeral listen port
/// - Development environment (insecure cookies, detailed errors)
/// - A one-hour session TTL with a short touch tolerance
/// - Generous sign-in rate limits
#[cfg(any(test, feature = "testing"))]
#[must_use]
pub fn create_test_config() -> Arc<Config> {
    Arc::new(Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        environment: Environment::Development,
        session_store_url: "memory://".to_string(),
        session_secret: "0000000000000000000000000000000000000000000000000000000000000000"
            .to_string(),
        session_ttl_secs: 3600,
        session_touch_secs: 600,
        signin_rate_window_secs: 60,
        signin_rate_max: 100,
        rate_sweep_interval_secs: 3600,
        app_name: "TestApp".to_string(),
        log_format: "pretty".to_string(),
    })
}
