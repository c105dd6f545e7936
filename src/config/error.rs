//! Error types and result aliases.
//!
//! Defines the core `AppError` enumeration and common `Result` type.

use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store connectivity or serialization failure.
    #[error("session store error: {0}")]
    SessionStore(String),

    /// User directory lookup failure.
    #[error("user directory error: {0}")]
    Directory(String),

    /// Password hashing or verification failure.
    #[error("password error: {0}")]
    Password(String),
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
