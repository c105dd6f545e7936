//! The request pipeline.
//!
//! An explicit ordered list of stages wrapped around a business handler.
//! The driver resolves the session once up front, runs each stage until one
//! short-circuits, invokes the handler, drains flash for rendered replies,
//! and persists the session last. Stages are synchronous; the store is only
//! touched at the edges.

use crate::config::{Environment, Result};
use crate::core::context::{Reply, RequestCtx, StageOutcome};
use crate::core::middleware::SIGNIN_PATH;
use crate::session::{FlashLevel, Principal, RenderFlash, SessionManager};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Reply>> + Send + 'a>>;

/// One pipeline stage: a pure check over the request context.
pub trait Stage: Send + Sync {
    fn apply(&self, ctx: &mut RequestCtx) -> StageOutcome;
}

/// Revalidates a resolved principal against the account directory, so a
/// deactivated account loses its session on the next request.
#[async_trait]
pub trait PrincipalRevalidator: Send + Sync {
    /// Whether the account behind the session still exists and is active.
    async fn is_active(&self, principal: &Principal) -> Result<bool>;
}

/// Everything the serving layer needs to emit the response.
pub struct ServedReply {
    pub reply: Reply,
    pub flash: RenderFlash,
    pub set_cookie: Option<String>,
}

/// Orders the middleware stages around a business handler.
pub struct Pipeline {
    sessions: Arc<SessionManager>,
    environment: Environment,
    revalidator: Option<Arc<dyn PrincipalRevalidator>>,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>, environment: Environment) -> Self {
        Self {
            sessions,
            environment,
            revalidator: None,
            stages: Vec::new(),
        }
    }

    /// Appends a stage. Stages run in insertion order.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Enables principal revalidation for signed-in sessions.
    #[must_use]
    pub fn with_revalidator(mut self, revalidator: Arc<dyn PrincipalRevalidator>) -> Self {
        self.revalidator = Some(revalidator);
        self
    }

    /// Drives one request through the stages and handler.
    ///
    /// Handler errors are the only thing that reaches this top-level
    /// fallback: they are logged and answered with a generic page in
    /// production and the error detail in development. Denials, limits,
    /// and expiry never get here; they resolve to redirects upstream.
    pub async fn run<F>(&self, mut ctx: RequestCtx, handler: F) -> ServedReply
    where
        F: for<'a> FnOnce(&'a mut RequestCtx) -> HandlerFuture<'a>,
    {
        let (token, session) = self.sessions.resolve(ctx.cookie_header.as_deref()).await;
        ctx.token = token;
        ctx.session = session;

        let mut short_circuit = self.revalidate(&mut ctx).await;

        if short_circuit.is_none() {
            for stage in &self.stages {
                if let StageOutcome::ShortCircuit(reply) = stage.apply(&mut ctx) {
                    short_circuit = Some(reply);
                    break;
                }
            }
        }

        let reply = match short_circuit {
            Some(reply) => reply,
            None => match handler(&mut ctx).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(
                        error = %e,
                        http_method = %ctx.method,
                        http_path = %ctx.path,
                        "Unhandled error in request handler"
                    );
                    let body = if self.environment.is_production() {
                        "Something went wrong".to_string()
                    } else {
                        format!("Something went wrong: {e}")
                    };
                    Reply::with_status(500, body)
                }
            },
        };

        // Redirects carry no body; their queued messages stay in the
        // session and surface on the next rendered page.
        let flash = if reply.renders_body() {
            ctx.drain_flash()
        } else {
            RenderFlash::default()
        };

        let set_cookie = self
            .sessions
            .persist(
                ctx.token.as_deref(),
                ctx.session.as_ref(),
                ctx.session_dirty,
                ctx.session_destroyed,
            )
            .await;

        ServedReply {
            reply,
            flash,
            set_cookie,
        }
    }

    /// Drops the session of a principal whose account no longer exists or
    /// was deactivated, asking the user to sign in again. A directory
    /// failure is logged and the session kept.
    async fn revalidate(&self, ctx: &mut RequestCtx) -> Option<Reply> {
        let revalidator = self.revalidator.as_ref()?;
        let principal = ctx.principal().cloned()?;

        match revalidator.is_active(&principal).await {
            Ok(true) => None,
            Ok(false) => {
                info!(user_id = %principal.id, "Account no longer active, discarding session");
                if let Some(token) = ctx.token.take() {
                    self.sessions.destroy(&token).await;
                }
                ctx.session = None;
                ctx.flash(
                    FlashLevel::Error,
                    "Your session has expired. Please sign in again.",
                );
                Some(Reply::redirect(SIGNIN_PATH))
            }
            Err(e) => {
                warn!(error = %e, "Session revalidation failed, continuing");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::{AccessStage, RoutePolicy};
    use crate::session::{
        FlashLevel, MemorySessionStore, Principal, Role, SESSION_COOKIE_NAME, SessionData,
        cookie_value,
    };
    use crate::SessionStore;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn sessions(store: Arc<MemorySessionStore>) -> Arc<SessionManager> {
        Arc::new(SessionManager::with_options(
            store,
            "pipeline_test_secret",
            Duration::from_secs(3600),
            Duration::from_secs(600),
            false,
        ))
    }

    fn ctx(path: &str) -> RequestCtx {
        RequestCtx::new(IpAddr::V4(Ipv4Addr::LOCALHOST), "GET", path)
    }

    fn cookie_header_from(served: &ServedReply) -> Option<String> {
        let set_cookie = served.set_cookie.as_deref()?;
        let value = cookie_value(set_cookie, SESSION_COOKIE_NAME)?;
        Some(format!("{SESSION_COOKIE_NAME}={value}"))
    }

    #[tokio::test]
    async fn test_handler_runs_once_when_allowed() {
        let store = Arc::new(MemorySessionStore::new());
        let pipeline = Pipeline::new(sessions(store), Environment::Development)
            .stage(AccessStage::new(RoutePolicy::Public));

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_handler = Arc::clone(&calls);

        let served = pipeline
            .run(ctx("/jobs"), move |_ctx| {
                Box::pin(async move {
                    calls_in_handler.fetch_add(1, Ordering::SeqCst);
                    Ok(Reply::page("jobs"))
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(served.reply.status, 200);
    }

    #[tokio::test]
    async fn test_denied_request_never_reaches_handler() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = sessions(store.clone());

        // A signed-in job seeker hitting an employer route.
        let mut data = SessionData::new(now());
        data.principal = Some(Principal {
            id: "u1".to_string(),
            name: "Jo".to_string(),
            surname: "Seeker".to_string(),
            email: "jo@example.com".to_string(),
            role: Role::JobSeeker,
        });
        store
            .save("tok", &data, Duration::from_secs(600))
            .await
            .unwrap();
        let header = format!("{SESSION_COOKIE_NAME}={}", manager.signed_value("tok"));

        let pipeline = Pipeline::new(manager, Environment::Development)
            .stage(AccessStage::new(RoutePolicy::employer()));

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_handler = Arc::clone(&calls);

        let served = pipeline
            .run(
                ctx("/jobs/new").with_cookie_header(Some(header)),
                move |_ctx| {
                    Box::pin(async move {
                        calls_in_handler.fetch_add(1, Ordering::SeqCst);
                        Ok(Reply::page("new job form"))
                    })
                },
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(served.reply.status, 303);
        assert_eq!(served.reply.location.as_deref(), Some("/"));
        // The denial message travels via the session, not this redirect.
        assert!(served.flash.is_empty());
    }

    #[tokio::test]
    async fn test_handler_flash_visible_in_same_rendered_response() {
        let store = Arc::new(MemorySessionStore::new());
        let pipeline = Pipeline::new(sessions(store), Environment::Development);

        let served = pipeline
            .run(ctx("/"), |ctx| {
                Box::pin(async move {
                    ctx.flash(FlashLevel::Warning, "profile incomplete");
                    Ok(Reply::page("home"))
                })
            })
            .await;

        assert_eq!(
            served.flash.first(FlashLevel::Warning),
            Some("profile incomplete")
        );
    }

    #[tokio::test]
    async fn test_flash_survives_redirect_and_drains_next_request() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = sessions(store);
        let pipeline = Pipeline::new(Arc::clone(&manager), Environment::Development);

        let served = pipeline
            .run(ctx("/jobs/1/apply"), |ctx| {
                Box::pin(async move {
                    ctx.flash(FlashLevel::Success, "Application submitted successfully!");
                    Ok(Reply::redirect("/jobs/1"))
                })
            })
            .await;

        assert!(served.flash.is_empty());
        let header = cookie_header_from(&served).expect("session cookie issued");

        let pipeline2 = Pipeline::new(manager, Environment::Development);
        let served2 = pipeline2
            .run(
                ctx("/jobs/1").with_cookie_header(Some(header.clone())),
                |_ctx| Box::pin(async move { Ok(Reply::page("job")) }),
            )
            .await;

        assert_eq!(
            served2.flash.first(FlashLevel::Success),
            Some("Application submitted successfully!")
        );
    }

    #[tokio::test]
    async fn test_flash_drained_exactly_once_across_requests() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = sessions(store);
        let pipeline = Pipeline::new(Arc::clone(&manager), Environment::Development);

        let served = pipeline
            .run(ctx("/"), |ctx| {
                Box::pin(async move {
                    ctx.flash(FlashLevel::Info, "one shot");
                    Ok(Reply::redirect("/next"))
                })
            })
            .await;
        let header = cookie_header_from(&served).unwrap();

        let second = Pipeline::new(Arc::clone(&manager), Environment::Development)
            .run(
                ctx("/next").with_cookie_header(Some(header.clone())),
                |_ctx| Box::pin(async move { Ok(Reply::page("next")) }),
            )
            .await;
        assert_eq!(second.flash.first(FlashLevel::Info), Some("one shot"));
        let header = cookie_header_from(&second).unwrap_or(header);

        let third = Pipeline::new(manager, Environment::Development)
            .run(ctx("/next").with_cookie_header(Some(header)), |_ctx| {
                Box::pin(async move { Ok(Reply::page("next")) })
            })
            .await;
        assert!(third.flash.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_is_generic_in_production() {
        use crate::config::AppError;

        let store = Arc::new(MemorySessionStore::new());
        let pipeline = Pipeline::new(sessions(store.clone()), Environment::Production);

        let served = pipeline
            .run(ctx("/"), |_ctx| {
                Box::pin(async move {
                    Err(AppError::Directory("connection refused".to_string()))
                })
            })
            .await;

        assert_eq!(served.reply.status, 500);
        assert_eq!(served.reply.body, "Something went wrong");

        let dev_pipeline = Pipeline::new(sessions(store), Environment::Development);
        let served = dev_pipeline
            .run(ctx("/"), |_ctx| {
                Box::pin(async move {
                    Err(AppError::Directory("connection refused".to_string()))
                })
            })
            .await;
        assert!(served.reply.body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_deactivated_account_loses_session() {
        struct DenyAll;

        #[async_trait]
        impl PrincipalRevalidator for DenyAll {
            async fn is_active(&self, _principal: &Principal) -> Result<bool> {
                Ok(false)
            }
        }

        let store = Arc::new(MemorySessionStore::new());
        let manager = sessions(store.clone());

        let mut data = SessionData::new(now());
        data.principal = Some(Principal {
            id: "gone".to_string(),
            name: "Old".to_string(),
            surname: "Account".to_string(),
            email: "old@example.com".to_string(),
            role: Role::Employer,
        });
        store
            .save("tok", &data, Duration::from_secs(600))
            .await
            .unwrap();
        let header = format!("{SESSION_COOKIE_NAME}={}", manager.signed_value("tok"));

        let pipeline = Pipeline::new(Arc::clone(&manager), Environment::Development)
            .with_revalidator(Arc::new(DenyAll));

        let served = pipeline
            .run(
                ctx("/jobs/new").with_cookie_header(Some(header.clone())),
                |_ctx| Box::pin(async move { Ok(Reply::page("unreachable")) }),
            )
            .await;

        assert_eq!(served.reply.location.as_deref(), Some("/auth/signin"));

        // The old session is gone; the expiry message rides a fresh one.
        let (token, session) = manager.resolve(Some(&header)).await;
        assert!(token.is_none());
        assert!(session.is_none());

        let fresh_header = cookie_header_from(&served).unwrap();
        let (_, fresh) = manager.resolve(Some(&fresh_header)).await;
        assert!(!fresh.unwrap().flash.is_empty());
    }

    #[tokio::test]
    async fn test_session_state_persists_across_requests() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = sessions(store);

        let served = Pipeline::new(Arc::clone(&manager), Environment::Development)
            .run(ctx("/auth/signin"), |ctx| {
                Box::pin(async move {
                    ctx.session_mut().principal = Some(Principal {
                        id: "u9".to_string(),
                        name: "Robin".to_string(),
                        surname: "Hire".to_string(),
                        email: "robin@example.com".to_string(),
                        role: Role::Employer,
                    });
                    Ok(Reply::redirect("/"))
                })
            })
            .await;
        let header = cookie_header_from(&served).unwrap();

        let served2 = Pipeline::new(manager, Environment::Development)
            .stage(AccessStage::new(RoutePolicy::employer()))
            .run(
                ctx("/jobs/new").with_cookie_header(Some(header)),
                |ctx| {
                    let who = ctx.principal().map(|p| p.email.clone()).unwrap_or_default();
                    Box::pin(async move { Ok(Reply::page(who)) })
                },
            )
            .await;

        assert_eq!(served2.reply.status, 200);
        assert_eq!(served2.reply.body, "robin@example.com");
    }
}
