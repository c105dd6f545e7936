//! Middleware components.
//!
//! Rate limiting and role-based access control, each usable as a pipeline
//! stage.

mod access;
mod ratelimit;

pub use access::{
    AccessDecision, AccessStage, HOME_PATH, RoutePolicy, SIGNIN_PATH, evaluate,
};
pub use ratelimit::{
    RateDecision, RateLimitOptions, RateLimitStage, RateLimiter, SweeperHandle,
};
