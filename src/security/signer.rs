//! Session cookie signing.
//!
//! The cookie value is `token.signature`; the server never trusts a token
//! whose HMAC does not verify, so forged or truncated cookies resolve to
//! anonymous before any store round-trip.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenSigner {
    master_key: [u8; 32],
}

impl TokenSigner {
    /// Creates a new `TokenSigner` using the provided secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let result = hasher.finalize();
        let mut master_key = [0u8; 32];
        master_key.copy_from_slice(&result);
        Self { master_key }
    }

    /// Produces the cookie value for a session token.
    ///
    /// # Panics
    ///
    /// Panics if HMAC initialization fails (invalid key length), though this
    /// is statically prevented by the fixed key size.
    #[must_use]
    pub fn sign(&self, token: &str) -> String {
        let signature = URL_SAFE_NO_PAD.encode(self.mac(token));
        format!("{token}.{signature}")
    }

    /// Recovers the session token from a cookie value, or `None` if the
    /// signature is missing, malformed, or does not verify.
    #[must_use]
    pub fn verify(&self, value: &str) -> Option<String> {
        let (token, signature) = value.split_once('.')?;
        if token.is_empty() {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.master_key)
            .expect("HMAC accepts any key size");
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(token.to_string())
    }

    fn mac(&self, token: &str) -> [u8; 32] {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.master_key)
            .expect("HMAC accepts any key size");
        mac.update(token.as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }
}
