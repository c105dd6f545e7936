//! Configuration and error types.

mod error;
mod settings;

pub use error::{AppError, Result};
pub use settings::{Config, Environment};
