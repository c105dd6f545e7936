//! Route handlers.
//!
//! Handlers stay deliberately thin: they run business calls, mutate the
//! session, queue flash messages, and pick a redirect or page reply. Page
//! bodies are plain text; real rendering belongs to the template layer in
//! front of this service.

use crate::auth::{AuthService, NewAccount, SignInError};
use crate::config::Config;
use crate::core::middleware::{
    AccessStage, HOME_PATH, RateLimitStage, RateLimiter, RoutePolicy, SIGNIN_PATH,
};
use crate::core::{Pipeline, Reply, RequestCtx, ServedReply};
use crate::session::{FlashLevel, Role, SessionManager};
use axum::body::Body;
use axum::extract::{ConnectInfo, Form, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

/// Shared application state: configuration plus the gateway components,
/// created once at startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<AuthService>,
    pub signin_limiter: Arc<RateLimiter>,
}

impl AppState {
    fn pipeline(&self, policy: RoutePolicy) -> Pipeline {
        Pipeline::new(self.sessions.clone(), self.config.environment)
            .with_revalidator(self.auth.clone())
            .stage(AccessStage::new(policy))
    }

    /// Sign-in endpoints additionally sit behind the rate limiter; the
    /// limiter runs first since it gates by client address irrespective of
    /// session.
    fn signin_pipeline(&self) -> Pipeline {
        Pipeline::new(self.sessions.clone(), self.config.environment)
            .stage(RateLimitStage::new(self.signin_limiter.clone()))
            .stage(AccessStage::new(RoutePolicy::GuestOnly))
    }
}

fn request_ctx(addr: SocketAddr, method: &str, path: &str, headers: &HeaderMap) -> RequestCtx {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    RequestCtx::new(addr.ip(), method, path)
        .with_cookie_header(cookie)
        .with_referer(referer)
}

fn respond(served: ServedReply) -> Response {
    let ServedReply {
        reply,
        flash,
        set_cookie,
    } = served;

    let mut builder = Response::builder().status(reply.status);
    if let Some(cookie) = set_cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }

    let result = if let Some(location) = reply.location {
        builder.header(header::LOCATION, location).body(Body::empty())
    } else {
        let mut body = String::new();
        for (level, messages) in flash.iter() {
            for message in messages {
                body.push_str(&format!("[{}] {message}\n", level.as_str()));
            }
        }
        body.push_str(&reply.body);
        builder
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from(body))
    };

    result.unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", HOME_PATH, &headers);
    let app_name = state.config.app_name.clone();

    let served = state
        .pipeline(RoutePolicy::Public)
        .run(ctx, move |ctx| {
            let greeting = ctx
                .principal()
                .map(|p| format!("Signed in as {} {} ({})", p.name, p.surname, p.role));
            Box::pin(async move {
                let mut body = format!("{app_name} - Find Your Dream Job\n");
                if let Some(greeting) = greeting {
                    body.push_str(&greeting);
                    body.push('\n');
                }
                Ok(Reply::page(body))
            })
        })
        .await;

    respond(served)
}

pub async fn jobs(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", "/jobs", &headers);

    let served = state
        .pipeline(RoutePolicy::Public)
        .run(ctx, |_ctx| {
            Box::pin(async move { Ok(Reply::page("Browse Jobs\n")) })
        })
        .await;

    respond(served)
}

pub async fn jobs_new(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", "/jobs/new", &headers);

    let served = state
        .pipeline(RoutePolicy::employer())
        .run(ctx, |_ctx| {
            Box::pin(async move { Ok(Reply::page("Post a Job\n")) })
        })
        .await;

    respond(served)
}

pub async fn admin(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", "/admin", &headers);

    let served = state
        .pipeline(RoutePolicy::admin_only())
        .run(ctx, |_ctx| {
            Box::pin(async move { Ok(Reply::page("Admin Dashboard\n")) })
        })
        .await;

    respond(served)
}

pub async fn signin_page(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", SIGNIN_PATH, &headers);
    let app_name = state.config.app_name.clone();

    let served = state
        .pipeline(RoutePolicy::GuestOnly)
        .run(ctx, move |_ctx| {
            Box::pin(async move { Ok(Reply::page(format!("Sign In - {app_name}\n"))) })
        })
        .await;

    respond(served)
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub role: String,
}

pub async fn signin_submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<SignInForm>,
) -> Response {
    let ctx = request_ctx(addr, "POST", SIGNIN_PATH, &headers);
    let auth = state.auth.clone();

    let served = state
        .signin_pipeline()
        .run(ctx, move |ctx| {
            Box::pin(async move {
                let result = match form.role.parse::<Role>() {
                    Ok(role) => auth.sign_in(&form.email, &form.password, role).await,
                    Err(()) => Err(SignInError::WrongAccountType),
                };

                match result {
                    Ok(principal) => {
                        ctx.session_mut().principal = Some(principal);
                        ctx.flash(FlashLevel::Success, "Successfully signed in!");
                        let target = ctx
                            .take_return_to()
                            .unwrap_or_else(|| HOME_PATH.to_string());
                        Ok(Reply::redirect(target))
                    }
                    Err(refusal) => {
                        ctx.flash(FlashLevel::Error, refusal.message());
                        Ok(Reply::redirect(SIGNIN_PATH))
                    }
                }
            })
        })
        .await;

    respond(served)
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<SignUpForm>,
) -> Response {
    let ctx = request_ctx(addr, "POST", "/auth/signup", &headers);
    let auth = state.auth.clone();

    let served = state
        .signin_pipeline()
        .run(ctx, move |ctx| {
            Box::pin(async move {
                let account = NewAccount {
                    name: form.name,
                    surname: form.surname,
                    email: form.email,
                    password: form.password,
                };

                match auth.sign_up(account).await {
                    Ok(principal) => {
                        ctx.session_mut().principal = Some(principal);
                        ctx.flash(FlashLevel::Success, "Account created successfully!");
                        Ok(Reply::redirect(HOME_PATH))
                    }
                    Err(refusal) => {
                        ctx.flash(FlashLevel::Error, refusal.message());
                        Ok(Reply::redirect(SIGNIN_PATH))
                    }
                }
            })
        })
        .await;

    respond(served)
}

pub async fn signout(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_ctx(addr, "GET", "/auth/signout", &headers);

    let served = state
        .pipeline(RoutePolicy::Public)
        .run(ctx, |ctx| {
            Box::pin(async move {
                ctx.destroy_session();
                Ok(Reply::redirect(HOME_PATH))
            })
        })
        .await;

    respond(served)
}

pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("404 - Page Not Found\n{}\n", uri.path()),
    )
        .into_response()
}
