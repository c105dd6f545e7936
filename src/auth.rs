//! Authentication flows and the user directory boundary.

mod directory;
mod service;

pub use directory::{MemoryUserDirectory, UserDirectory, UserRecord};
pub use service::{AuthService, NewAccount, SignInError, SignUpError};
