//! In-memory request rate limiting.
//!
//! Each guarded mount point owns a limiter: a concurrent map from client
//! address to a fixed-window counter, plus a background sweep that evicts
//! records whose window has passed.
//!
//! The map is per-process. In a multi-process deployment each process
//! enforces its own budget; the limiter deters abuse, it does not do
//! precise global quota accounting. Likewise a client idle just under the
//! sweep interval may be evicted and regain a fresh window early.

use crate::core::context::{Reply, RequestCtx, StageOutcome};
use crate::core::pipeline::Stage;
use crate::session::FlashLevel;
use papaya::{Compute, HashMap, Operation};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Options for one guarded mount point. Window length, request budget, and
/// the rejection message; nothing else is configurable.
#[derive(Debug, Clone)]
pub struct RateLimitOptions {
    pub window: Duration,
    pub max_requests: u32,
    pub message: String,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
            message: "Too many requests, please try again later".to_string(),
        }
    }
}

/// Outcome of one rate-limit check. Rejection is an expected condition
/// carrying the user-facing message, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { message: String },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: u64,
}

/// Per-client fixed-window request counter.
pub struct RateLimiter {
    options: RateLimitOptions,
    windows: HashMap<IpAddr, Window>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            options,
            windows: HashMap::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &RateLimitOptions {
        &self.options
    }

    /// Records a request for `key` and decides whether it may proceed.
    ///
    /// Within a window the count only grows; at the budget it stops growing
    /// and requests are rejected. The instant the window boundary passes,
    /// the next request opens a fresh window with count 1.
    pub fn check_and_record(&self, key: IpAddr) -> RateDecision {
        let now = epoch_ms();
        let window_ms = u64::try_from(self.options.window.as_millis()).unwrap_or(u64::MAX);
        let max = self.options.max_requests;

        let guard = self.windows.pin();
        let result = guard.compute(key, |entry| match entry {
            None => Operation::Insert(Window {
                count: 1,
                reset_at: now + window_ms,
            }),
            Some((_, window)) if now > window.reset_at => Operation::Insert(Window {
                count: 1,
                reset_at: now + window_ms,
            }),
            Some((_, window)) if window.count >= max => Operation::Abort(()),
            Some((_, window)) => Operation::Insert(Window {
                count: window.count + 1,
                reset_at: window.reset_at,
            }),
        });

        match result {
            Compute::Aborted(()) => RateDecision::Limited {
                message: self.options.message.clone(),
            },
            _ => RateDecision::Allowed,
        }
    }

    /// Evicts records whose window has passed, returning how many were
    /// removed.
    pub fn evict_expired(&self) -> usize {
        let now = epoch_ms();
        let windows = self.windows.pin();

        let stale: Vec<IpAddr> = windows
            .iter()
            .filter(|(_, window)| now > window.reset_at)
            .map(|(key, _)| *key)
            .collect();

        let mut evicted = 0;
        for key in stale {
            let result = windows.compute(key, |entry| match entry {
                Some((_, window)) if now > window.reset_at => Operation::Remove,
                _ => Operation::Abort(()),
            });
            if matches!(result, Compute::Removed(..)) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Number of client records currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.pin().len()
    }

    /// Starts the periodic sweep task. The returned handle owns the task:
    /// stopping (or dropping) it stops the sweep.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_expired();
                if evicted > 0 {
                    debug!(evicted, "Swept expired rate-limit records");
                }
            }
        });
        SweeperHandle { handle }
    }

    /// Rewinds `key`'s window boundary as if `elapsed` had passed.
    #[cfg(any(test, feature = "testing"))]
    pub fn simulate_elapsed(&self, key: IpAddr, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let _ = self.windows.pin().compute(key, |entry| match entry {
            Some((_, window)) => Operation::Insert(Window {
                count: window.count,
                reset_at: window.reset_at.saturating_sub(ms),
            }),
            None => Operation::Abort(()),
        });
    }
}

/// Owns the background sweep task of a [`RateLimiter`].
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Pipeline stage bouncing over-budget clients back to the referring page
/// with the rejection message flashed.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Stage for RateLimitStage {
    fn apply(&self, ctx: &mut RequestCtx) -> StageOutcome {
        match self.limiter.check_and_record(ctx.client_addr) {
            RateDecision::Allowed => StageOutcome::Continue,
            RateDecision::Limited { message } => {
                warn!(
                    client_addr = %ctx.client_addr,
                    http_path = %ctx.path,
                    "Rate limit exceeded"
                );
                ctx.flash(FlashLevel::Error, message);
                let back = ctx.referer.clone().unwrap_or_else(|| "/".to_string());
                StageOutcome::ShortCircuit(Reply::rate_limited(back))
            }
        }
    }
}
