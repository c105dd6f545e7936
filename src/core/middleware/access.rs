//! Role-based access control.
//!
//! The gate is a pure function of the resolved principal and the route's
//! policy; it performs no I/O, which keeps it testable without a store or
//! an HTTP stack.

use crate::core::context::{Reply, RequestCtx, StageOutcome};
use crate::core::pipeline::Stage;
use crate::session::{FlashLevel, Principal, Role};
use tracing::debug;

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const HOME_PATH: &str = "/";

const SIGNIN_REQUIRED: &str = "Please sign in to access this page";
const PERMISSION_DENIED: &str = "You do not have permission to access this page";
const ADMIN_REQUIRED: &str = "Admin access required";
const EMPLOYER_REQUIRED: &str = "Employer/Recruiter access required";

/// Who may reach a route.
#[derive(Debug, Clone)]
pub enum RoutePolicy {
    /// Anyone, signed in or not.
    Public,
    /// Only signed-out visitors (sign-in and sign-up pages).
    GuestOnly,
    /// Any signed-in account, role irrelevant.
    Authenticated,
    /// Signed-in accounts whose role is in the accepted set.
    Roles {
        allowed: Vec<Role>,
        denied_message: &'static str,
    },
}

impl RoutePolicy {
    #[must_use]
    pub fn admin_only() -> Self {
        Self::Roles {
            allowed: vec![Role::Administrator],
            denied_message: ADMIN_REQUIRED,
        }
    }

    /// Employer-side routes: employers, recruiters, and administrators.
    #[must_use]
    pub fn employer() -> Self {
        Self::Roles {
            allowed: vec![Role::Employer, Role::Recruiter, Role::Administrator],
            denied_message: EMPLOYER_REQUIRED,
        }
    }

    /// An ad hoc accepted role set.
    #[must_use]
    pub fn roles(allowed: Vec<Role>) -> Self {
        Self::Roles {
            allowed,
            denied_message: PERMISSION_DENIED,
        }
    }
}

/// Where a request may go. Denials are always a redirect plus a flash
/// message, never a bare error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Redirect {
        location: &'static str,
        flash: Option<(FlashLevel, &'static str)>,
        /// Whether the originally requested path should be recorded for the
        /// post-sign-in redirect.
        remember_path: bool,
    },
}

/// Ordered checks, first match wins: unauthenticated, guest-only while
/// signed in, role mismatch, pass-through.
#[must_use]
pub fn evaluate(principal: Option<&Principal>, policy: &RoutePolicy) -> AccessDecision {
    match policy {
        RoutePolicy::Public => AccessDecision::Allow,

        RoutePolicy::GuestOnly => {
            if principal.is_some() {
                AccessDecision::Redirect {
                    location: HOME_PATH,
                    flash: None,
                    remember_path: false,
                }
            } else {
                AccessDecision::Allow
            }
        }

        RoutePolicy::Authenticated => {
            if principal.is_some() {
                AccessDecision::Allow
            } else {
                signin_redirect()
            }
        }

        RoutePolicy::Roles {
            allowed,
            denied_message,
        } => match principal {
            None => signin_redirect(),
            Some(principal) if allowed.contains(&principal.role) => AccessDecision::Allow,
            Some(_) => AccessDecision::Redirect {
                location: HOME_PATH,
                flash: Some((FlashLevel::Error, denied_message)),
                remember_path: false,
            },
        },
    }
}

fn signin_redirect() -> AccessDecision {
    AccessDecision::Redirect {
        location: SIGNIN_PATH,
        flash: Some((FlashLevel::Error, SIGNIN_REQUIRED)),
        remember_path: true,
    }
}

/// Pipeline stage applying a route's policy to the resolved session.
pub struct AccessStage {
    policy: RoutePolicy,
}

impl AccessStage {
    #[must_use]
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }
}

impl Stage for AccessStage {
    fn apply(&self, ctx: &mut RequestCtx) -> StageOutcome {
        match evaluate(ctx.principal(), &self.policy) {
            AccessDecision::Allow => StageOutcome::Continue,
            AccessDecision::Redirect {
                location,
                flash,
                remember_path,
            } => {
                debug!(
                    http_path = %ctx.path,
                    redirect_to = location,
                    "Access denied"
                );
                if remember_path {
                    let path = ctx.path.clone();
                    ctx.session_mut().return_to = Some(path);
                }
                if let Some((level, message)) = flash {
                    ctx.flash(level, message);
                }
                StageOutcome::ShortCircuit(Reply::redirect(location))
            }
        }
    }
}
