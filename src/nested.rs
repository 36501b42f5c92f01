//! Nested routers
//!
//! A router mounted inside another is collapsed into one handler that walks
//! the mounted router's own chain. When that chain is exhausted the walk
//! falls through to the enclosing chain's continuation, so middleware
//! registered after the mount point still gets a chance at the route.
//!
//! The mounted router's chain is read at dispatch time: middleware added to
//! it after mounting is picked up by the next routing.

use crate::context::RouteContext;
use crate::handler::{boxed, handler_fn, BoxedHandler, Flow, RouteValue};
use crate::pipeline::{self, Next, Tail};
use crate::router::Router;
use crate::trace_log;

/// Collapse `router` into a single handler for use as a mount point.
pub(crate) fn compose<T: RouteValue>(router: Router<T>) -> BoxedHandler<T> {
    boxed(handler_fn(move |ctx: RouteContext<T>, next: Next<T>| {
        let chain = router.chain();
        trace_log!(
            "entering mounted router ({} middleware) at {}",
            chain.len(),
            ctx.path
        );
        async move {
            let outcome = pipeline::run(chain, 0, ctx, Tail::Outer(Box::new(next))).await?;
            Ok(Flow::from(outcome))
        }
    }))
}
