//! Request pipeline core.

pub mod context;
pub mod middleware;
pub mod pipeline;

pub use context::{Reply, RequestCtx, StageOutcome};
pub use pipeline::{HandlerFuture, Pipeline, ServedReply, Stage};
