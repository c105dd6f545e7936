//! White Collars gateway server.
//!
//! Initializes the application runtime, loads configuration, sets up
//! logging, and launches the HTTP service.

use collars::auth::{AuthService, MemoryUserDirectory, NewAccount};
use collars::config::Config;
use collars::core::middleware::{RateLimitOptions, RateLimiter};
use collars::security::PasswordHasher;
use collars::session::{RedisSessionStore, Role, SessionManager};
use collars::web::{AppState, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking);

    if log_format.eq_ignore_ascii_case("pretty") {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    let config = Config::from_env();
    info!(
        listen_addr = %config.listen_addr,
        environment = ?config.environment,
        log_format = %config.log_format,
        "Server initialized"
    );

    let store = RedisSessionStore::connect(&config.session_store_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to session store: {e}"));
    let sessions = Arc::new(SessionManager::new(Arc::new(store), &config));

    let signin_limiter = Arc::new(RateLimiter::new(RateLimitOptions {
        window: Duration::from_secs(config.signin_rate_window_secs),
        max_requests: config.signin_rate_max,
        message: "Too many sign-in attempts, please try again later".to_string(),
    }));
    let sweeper =
        signin_limiter.start_sweeper(Duration::from_secs(config.rate_sweep_interval_secs));

    let directory = Arc::new(MemoryUserDirectory::new());
    let auth = Arc::new(AuthService::new(directory, PasswordHasher::new()));
    seed_admin(&auth).await;

    let state = Arc::new(AppState {
        config: config.clone(),
        sessions,
        auth,
        signin_limiter,
    });

    let app = build_router(state);
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {e}", config.listen_addr));
    info!(listen_addr = %config.listen_addr, "Server running");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server failed");

    sweeper.stop();
    info!("Server shut down");
}

/// Seeds an administrator account when `SEED_ADMIN_EMAIL` and
/// `SEED_ADMIN_PASSWORD` are set, mirroring the seed script of the full
/// deployment.
async fn seed_admin(auth: &AuthService) {
    let (Ok(email), Ok(password)) = (
        std::env::var("SEED_ADMIN_EMAIL"),
        std::env::var("SEED_ADMIN_PASSWORD"),
    ) else {
        return;
    };

    let account = NewAccount {
        name: "Site".to_string(),
        surname: "Admin".to_string(),
        email: email.clone(),
        password,
    };

    match auth.create_account(account, Role::Administrator).await {
        Ok(_) => info!(email = %email, "Seeded administrator account"),
        Err(e) => warn!(reason = e.message(), "Could not seed administrator account"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
