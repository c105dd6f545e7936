//! Session lifecycle, data model, and flash messaging.

mod data;
mod flash;
mod memory;
mod redis;
mod store;
mod token;

pub use data::{Principal, Role, SessionData};
pub use flash::{FlashLevel, FlashQueue, RenderFlash};
pub use memory::MemorySessionStore;
pub use self::redis::RedisSessionStore;
pub use store::{SessionManager, SessionStore};
pub use token::{SESSION_COOKIE_NAME, cookie_value, format_set_cookie, generate_session_token};
