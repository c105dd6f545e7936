use collars::auth::{AuthService, MemoryUserDirectory, NewAccount};
use collars::config::{Config, Environment};
use collars::core::middleware::{RateLimitOptions, RateLimiter};
use collars::security::PasswordHasher;
use collars::session::{MemorySessionStore, Role, SessionManager};
use collars::web::{AppState, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_PASSWORD: &str = "pw123456";

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

/// Starts the application on an ephemeral port with an in-memory session
/// store and a directory seeded with one account per role. Returns the base
/// URL.
pub async fn spawn_app(config: Arc<Config>) -> String {
    let store = Arc::new(MemorySessionStore::new());
    let sessions = Arc::new(SessionManager::new(store, &config));

    let directory = Arc::new(MemoryUserDirectory::new());
    let auth = Arc::new(AuthService::new(
        directory,
        PasswordHasher::with_params(4096, 1, 1),
    ));
    seed_users(&auth).await;

    let signin_limiter = Arc::new(RateLimiter::new(RateLimitOptions {
        window: Duration::from_secs(config.signin_rate_window_secs),
        max_requests: config.signin_rate_max,
        message: "Too many sign-in attempts, please try again later".to_string(),
    }));

    let state = Arc::new(AppState {
        config,
        sessions,
        auth,
        signin_limiter,
    });

    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}

async fn seed_users(auth: &AuthService) {
    let accounts = [
        ("admin@example.com", "Ada", Role::Administrator),
        ("employer@example.com", "Erin", Role::Employer),
        ("recruiter@example.com", "Remy", Role::Recruiter),
        ("seeker@example.com", "Sam", Role::JobSeeker),
    ];

    for (email, name, role) in accounts {
        auth.create_account(
            NewAccount {
                name: name.to_string(),
                surname: "Test".to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
            },
            role,
        )
        .await
        .unwrap();
    }
}

/// A client that keeps cookies but never follows redirects, so every hop
/// stays observable.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn sign_in(client: &reqwest::Client, base: &str, email: &str, role: &str) -> reqwest::Response {
    client
        .post(format!("{base}/auth/signin"))
        .form(&[("email", email), ("password", TEST_PASSWORD), ("role", role)])
        .send()
        .await
        .unwrap()
}
