//! Per-request context.
//!
//! The session is resolved once at the head of the pipeline and threaded
//! through every later stage and the handler as an explicit value, never
//! attached ad hoc mid-flight.

use crate::session::{FlashLevel, Principal, RenderFlash, SessionData};
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Context for a single request.
pub struct RequestCtx {
    pub client_addr: IpAddr,
    pub method: String,
    pub path: String,
    pub referer: Option<String>,
    pub(crate) cookie_header: Option<String>,
    pub(crate) token: Option<String>,
    pub(crate) session: Option<SessionData>,
    pub(crate) session_dirty: bool,
    pub(crate) session_destroyed: bool,
}

impl RequestCtx {
    #[must_use]
    pub fn new(client_addr: IpAddr, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client_addr,
            method: method.into(),
            path: path.into(),
            referer: None,
            cookie_header: None,
            token: None,
            session: None,
            session_dirty: false,
            session_destroyed: false,
        }
    }

    #[must_use]
    pub fn with_cookie_header(mut self, header: Option<String>) -> Self {
        self.cookie_header = header;
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    /// The signed-in account, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.session.as_ref().and_then(|s| s.principal.as_ref())
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    /// Mutable session access. Creates the session on first write and marks
    /// it for persistence.
    pub fn session_mut(&mut self) -> &mut SessionData {
        self.session_dirty = true;
        self.session.get_or_insert_with(|| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            SessionData::new(now)
        })
    }

    /// Queues a flash message for the next rendered page.
    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.session_mut().flash.enqueue(level, message);
    }

    /// Marks the session for destruction at the end of the request.
    pub fn destroy_session(&mut self) {
        self.session_destroyed = true;
    }

    /// Takes the recorded post-sign-in redirect path, if one was stored.
    pub fn take_return_to(&mut self) -> Option<String> {
        let target = self.session.as_mut()?.return_to.take();
        if target.is_some() {
            self.session_dirty = true;
        }
        target
    }

    /// Snapshots and clears the session's flash queue for rendering.
    pub(crate) fn drain_flash(&mut self) -> RenderFlash {
        match self.session.as_mut() {
            Some(session) if !session.flash.is_empty() => {
                self.session_dirty = true;
                session.flash.drain()
            }
            _ => RenderFlash::default(),
        }
    }
}

/// What a pipeline stage or handler tells the driver to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl Reply {
    /// A rendered page.
    #[must_use]
    pub fn page(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    /// A see-other redirect.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 303,
            location: Some(location.into()),
            body: String::new(),
        }
    }

    /// The rate-limit rejection outcome: too-many-requests, bounced back to
    /// the referring page.
    #[must_use]
    pub fn rate_limited(location: impl Into<String>) -> Self {
        Self {
            status: 429,
            location: Some(location.into()),
            body: String::new(),
        }
    }

    /// Whether this reply produces a page body (and therefore consumes the
    /// flash queue). Redirects leave the queue for the next rendered page.
    #[must_use]
    pub fn renders_body(&self) -> bool {
        self.location.is_none()
    }
}

/// Result of applying one pipeline stage.
pub enum StageOutcome {
    /// Hand the request to the next stage (or the handler).
    Continue,
    /// Stop here and send this reply.
    ShortCircuit(Reply),
}
