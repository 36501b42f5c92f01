//! Middleware registration and wrapping
//!
//! Anything a router can dispatch to is a [`Middleware`]: a handler, another
//! router mounted under a prefix, or a lazily loaded middleware. On
//! registration each one is wrapped into a [`Layer`] that applies its path
//! pattern:
//!
//! - no pattern (`""` or `"*"`): the handler always runs with the context
//!   as is;
//! - a pattern: the handler runs only when the context path matches, with a
//!   derived context carrying the captures (and, for mount points, the
//!   unmatched remainder as its path).
//!
//! Routers and lazy middleware are mount points, plain handlers match whole
//! paths.
//!
//! # Example
//!
//! ```
//! use middle_router::{handler_fn, Flow, Middleware, Next, Router};
//!
//! let admin: Router<&'static str> = Router::new()
//!     .handle("/users", |_ctx, _next| async { Ok(Flow::Resolve("users")) });
//!
//! let passthrough: Middleware<&'static str> =
//!     Middleware::handler(handler_fn(|_ctx, next: Next<&'static str>| async move {
//!         Ok(Flow::from(next.run().await?))
//!     }));
//!
//! let app = Router::new()
//!     .use_middleware("/admin", admin)
//!     .use_middleware("", passthrough);
//! # let _ = app;
//! ```

use crate::context::RouteContext;
use crate::error::NavigationError;
use crate::handler::{boxed, BoxedHandler, HandlerResult, RouteHandler, RouteValue};
use crate::lazy::LazyHandler;
use crate::matcher::PathMatcher;
use crate::nested;
use crate::pipeline::Next;
use crate::router::Router;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Something a router can dispatch to
pub enum Middleware<T: RouteValue> {
    /// A handler matching whole paths
    Handler(BoxedHandler<T>),
    /// A router mounted under a prefix
    Router(Router<T>),
    /// A middleware produced on first use, mounted under a prefix
    Lazy(Arc<LazyHandler<T>>),
}

impl<T: RouteValue> Middleware<T> {
    pub fn handler<H: RouteHandler<T>>(handler: H) -> Self {
        Middleware::Handler(boxed(handler))
    }

    pub fn router(router: Router<T>) -> Self {
        Middleware::Router(router)
    }

    /// Defer creating a middleware until a matching route is dispatched.
    ///
    /// `factory` runs at most once. Its outcome, success or failure, is
    /// remembered and reused by every later dispatch.
    pub fn lazy<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(RouteContext<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Middleware<T>, NavigationError>> + Send + 'static,
    {
        Middleware::Lazy(Arc::new(LazyHandler::new(factory)))
    }

    /// Whether the pattern is matched as a prefix
    pub fn is_mount(&self) -> bool {
        !matches!(self, Middleware::Handler(_))
    }

    /// Collapse into a single callable.
    pub(crate) fn into_handler(self) -> BoxedHandler<T> {
        match self {
            Middleware::Handler(handler) => handler,
            Middleware::Router(router) => nested::compose(router),
            Middleware::Lazy(lazy) => lazy,
        }
    }
}

impl<T: RouteValue> From<Router<T>> for Middleware<T> {
    fn from(router: Router<T>) -> Self {
        Middleware::Router(router)
    }
}

impl<T: RouteValue> From<BoxedHandler<T>> for Middleware<T> {
    fn from(handler: BoxedHandler<T>) -> Self {
        Middleware::Handler(handler)
    }
}

impl<T: RouteValue> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Middleware::Handler(_) => f.write_str("Middleware::Handler"),
            Middleware::Router(router) => f.debug_tuple("Middleware::Router").field(router).finish(),
            Middleware::Lazy(_) => f.write_str("Middleware::Lazy"),
        }
    }
}

// ============================================================================
// Layers
// ============================================================================

/// A middleware wrapped with its path pattern
pub(crate) struct Layer<T: RouteValue> {
    matcher: Option<Arc<PathMatcher>>,
    handler: BoxedHandler<T>,
}

impl<T: RouteValue> Layer<T> {
    pub(crate) fn wrap(pattern: &str, middleware: Middleware<T>) -> Self {
        let mount = middleware.is_mount();
        let matcher = if is_unconditional(pattern) {
            None
        } else {
            Some(Arc::new(PathMatcher::compile(pattern, mount)))
        };
        Self {
            matcher,
            handler: middleware.into_handler(),
        }
    }

    /// Run the handler if the pattern accepts `ctx.path`; `None` means the
    /// layer was skipped.
    pub(crate) fn dispatch(
        &self,
        ctx: &RouteContext<T>,
        next: Next<T>,
    ) -> Option<BoxFuture<'static, HandlerResult<T>>> {
        let Some(matcher) = &self.matcher else {
            return Some(self.handler.call(ctx.clone(), next));
        };
        let found = matcher.test(&ctx.path)?;
        let derived = ctx.derive(found.remainder, found.params);
        Some(self.handler.call(derived, next))
    }

    #[cfg(test)]
    pub(crate) fn pattern(&self) -> Option<&str> {
        self.matcher.as_deref().map(PathMatcher::pattern)
    }
}

impl<T: RouteValue> Clone for Layer<T> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

fn is_unconditional(pattern: &str) -> bool {
    pattern.is_empty() || pattern == "*"
}
