//! Security header injection.

use axum::http::HeaderValue;
use axum::response::Response;

const CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; \
     font-src 'self' data:";

/// Injects the standard security headers into an outgoing response.
pub fn inject_security_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert("X-Frame-Options", HeaderValue::from_static("SAMEORIGIN"));
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("Content-Security-Policy", HeaderValue::from_static(CSP));
}
