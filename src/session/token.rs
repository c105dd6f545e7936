//! Session tokens and cookie formatting.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;

pub const SESSION_COOKIE_NAME: &str = "collars_session";

/// Generates a new opaque, unguessable session token.
#[must_use]
pub fn generate_session_token() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[must_use]
pub fn format_set_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{name}={value}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={max_age}")
}

/// Cookie string that removes the session cookie from the client.
#[must_use]
pub fn format_expired_cookie(name: &str, secure: bool) -> String {
    format_set_cookie(name, "", 0, secure)
}

/// Extracts the named cookie's value from a `Cookie` request header.
#[must_use]
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}
