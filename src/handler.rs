//! Route handler trait and types
//!
//! A handler receives the (possibly derived) [`RouteContext`] and a [`Next`]
//! continuation and answers with a [`Flow`]:
//!
//! - `Flow::Resolve(value)` settles the dispatch with `value`;
//! - `Flow::Continue` hands over to the following middleware;
//! - an `Err` stops the dispatch and fails the routing.
//!
//! Awaiting `next.run()` inside a handler runs every downstream middleware
//! first and gives back their outcome, so code placed after it runs once the
//! rest of the chain is done.
//!
//! # Example
//!
//! ```
//! use middle_router::{handler_fn, Flow, Next, RouteContext};
//!
//! let timing = handler_fn(|_ctx: RouteContext<String>, next: Next<String>| async move {
//!     let downstream = next.run().await?;
//!     Ok(Flow::from(downstream.map(|page| format!("<main>{}</main>", page))))
//! });
//! # let _ = timing;
//! ```

use crate::context::RouteContext;
use crate::error::NavigationError;
use crate::pipeline::Next;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Values a routing can settle with.
///
/// Routing results are shared between every awaiter of a routing handle,
/// hence the `Clone + Sync` requirement.
pub trait RouteValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> RouteValue for T {}

/// What a handler tells the dispatch pipeline to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow<T> {
    /// Settle the routing with this value; nothing downstream runs
    Resolve(T),
    /// Let the following middleware handle the route
    Continue,
}

impl<T> Flow<T> {
    pub fn resolve(value: T) -> Self {
        Flow::Resolve(value)
    }

    pub fn is_resolve(&self) -> bool {
        matches!(self, Flow::Resolve(_))
    }
}

/// `Some` resolves, `None` continues; handy for forwarding `next.run()`.
impl<T> From<Option<T>> for Flow<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Flow::Continue, Flow::Resolve)
    }
}

/// Result returned by every handler
pub type HandlerResult<T> = Result<Flow<T>, NavigationError>;

/// A route handler
///
/// Handlers use an associated `Future` type so concrete handlers are not
/// forced to box; the router erases them into [`BoxedHandler`] on
/// registration.
///
/// ```
/// use middle_router::{Flow, HandlerResult, Next, RouteContext, RouteHandler};
/// use std::future::{ready, Ready};
///
/// struct Static(&'static str);
///
/// impl RouteHandler<&'static str> for Static {
///     type Future = Ready<HandlerResult<&'static str>>;
///
///     fn call(&self, _ctx: RouteContext<&'static str>, _next: Next<&'static str>) -> Self::Future {
///         ready(Ok(Flow::Resolve(self.0)))
///     }
/// }
/// ```
pub trait RouteHandler<T: RouteValue>: Send + Sync + 'static {
    /// The future returned by `call`
    type Future: Future<Output = HandlerResult<T>> + Send + 'static;

    fn call(&self, ctx: RouteContext<T>, next: Next<T>) -> Self::Future;
}

/// Type-erased handler for dynamic dispatch
pub type BoxedHandler<T> =
    Arc<dyn RouteHandler<T, Future = BoxFuture<'static, HandlerResult<T>>>>;

/// Erase a handler's future type.
pub fn boxed<T, H>(handler: H) -> BoxedHandler<T>
where
    T: RouteValue,
    H: RouteHandler<T>,
{
    Arc::new(Boxed(handler))
}

struct Boxed<H>(H);

impl<T, H> RouteHandler<T> for Boxed<H>
where
    T: RouteValue,
    H: RouteHandler<T>,
{
    type Future = BoxFuture<'static, HandlerResult<T>>;

    fn call(&self, ctx: RouteContext<T>, next: Next<T>) -> Self::Future {
        Box::pin(self.0.call(ctx, next))
    }
}

/// Create a handler from an async function or closure
pub fn handler_fn<T, F, Fut>(f: F) -> FnHandler<F>
where
    T: RouteValue,
    F: Fn(RouteContext<T>, Next<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<T>> + Send + 'static,
{
    FnHandler { f }
}

/// Handler created from a function or closure
pub struct FnHandler<F> {
    f: F,
}

impl<T, F, Fut> RouteHandler<T> for FnHandler<F>
where
    T: RouteValue,
    F: Fn(RouteContext<T>, Next<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<T>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, ctx: RouteContext<T>, next: Next<T>) -> Self::Future {
        (self.f)(ctx, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_from_option() {
        assert_eq!(Flow::from(Some(3)), Flow::Resolve(3));
        assert_eq!(Flow::<i32>::from(None), Flow::Continue);
    }

    #[test]
    fn test_flow_helpers() {
        assert!(Flow::resolve("done").is_resolve());
        assert!(!Flow::<&str>::Continue.is_resolve());
    }
}
