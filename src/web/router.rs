//! Route table and HTTP middleware layers.

use crate::security::inject_security_headers;
use crate::web::handlers::{self, AppState};
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Builds the application router.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route(
            "/auth/signin",
            get(handlers::signin_page).post(handlers::signin_submit),
        )
        .route("/auth/signup", post(handlers::signup_submit))
        .route("/auth/signout", get(handlers::signout))
        .route("/jobs", get(handlers::jobs))
        .route("/jobs/new", get(handlers::jobs_new))
        .route("/admin", get(handlers::admin))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    inject_security_headers(&mut response);
    response
}

async fn request_logging(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();
    if status >= 400 {
        warn!(
            http_method = %method,
            http_path = %path,
            status,
            duration_ms,
            "Request completed"
        );
    } else {
        info!(
            http_method = %method,
            http_path = %path,
            status,
            duration_ms,
            "Request completed"
        );
    }
    response
}
