//! Per-dispatch route context
//!
//! A [`RouteContext`] is created for every `route` call and handed to each
//! middleware. Matching a pattern never mutates it: the pipeline derives a
//! copy with the mount remainder as `path` and the captures added to
//! `params`, so siblings and ancestors keep seeing their own view.

use crate::events::SubscriptionId;
use crate::handler::RouteValue;
use crate::lifecycle::BeforeExitEvent;
use crate::location::Location;
use crate::params::RouteParams;
use crate::router::Router;
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Opaque caller-supplied state attached to a routing call.
///
/// Handed through to every middleware unchanged; the router never looks
/// inside.
pub type RouteState = Arc<dyn Any + Send + Sync>;

/// Context available to every middleware during one dispatch
pub struct RouteContext<T: RouteValue> {
    /// Path relative to the current mount point
    pub path: String,
    /// Captures accumulated from the root down to this middleware
    pub params: RouteParams,
    /// State passed to `route`, or recorded in the history entry
    pub state: Option<RouteState>,
    /// The full parsed URL being routed
    pub location: Arc<Location>,
    /// The top-level router that started this dispatch
    pub router: Router<T>,
    /// Resolves when the next routing begins; only set while listening
    pub exiting: Option<Exiting>,
    app: Option<Arc<dyn Any + Send + Sync>>,
}

impl<T: RouteValue> RouteContext<T> {
    pub(crate) fn root(
        router: Router<T>,
        location: Location,
        state: Option<RouteState>,
        exiting: Option<Exiting>,
        app: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            path: location.pathname.clone(),
            params: RouteParams::new(),
            state,
            location: Arc::new(location),
            router,
            exiting,
            app,
        }
    }

    /// Copy of this context as seen by a matched middleware.
    ///
    /// `remainder` is only present for mount points; exact matches keep the
    /// current path.
    pub(crate) fn derive(&self, remainder: Option<String>, captures: Vec<(String, String)>) -> Self {
        let mut derived = self.clone();
        if let Some(remainder) = remainder {
            derived.path = remainder;
        }
        if !captures.is_empty() {
            derived.params = self.params.extended(captures);
        }
        derived
    }

    /// Register a before-exit handler for the current route.
    ///
    /// Only takes effect while a navigator is listening; returns `None`
    /// otherwise. Handlers are dropped once the route is left.
    pub fn before_exit<F>(&self, handler: F) -> Option<SubscriptionId>
    where
        F: Fn(&mut BeforeExitEvent) -> Option<String> + Send + Sync + 'static,
    {
        if !self.router.is_listening() {
            return None;
        }
        Some(self.router.before_exit_handlers().subscribe(handler))
    }

    /// Shared application context configured on the router, downcast to `C`
    pub fn app<C: Any + Send + Sync>(&self) -> Option<&C> {
        self.app.as_deref()?.downcast_ref()
    }

    /// Routing state downcast to `S`
    pub fn state_as<S: Any + Send + Sync>(&self) -> Option<&S> {
        self.state.as_deref()?.downcast_ref()
    }

    /// Whether a navigator is currently driving this router
    pub fn is_listening(&self) -> bool {
        self.exiting.is_some()
    }
}

impl<T: RouteValue> Clone for RouteContext<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            params: self.params.clone(),
            state: self.state.clone(),
            location: Arc::clone(&self.location),
            router: self.router.clone(),
            exiting: self.exiting.clone(),
            app: self.app.clone(),
        }
    }
}

impl<T: RouteValue> fmt::Debug for RouteContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("location", &self.location.href)
            .field("has_state", &self.state.is_some())
            .field("exiting", &self.exiting.is_some())
            .finish()
    }
}

// ============================================================================
// Exit signal
// ============================================================================

/// Future that completes when the router starts its next routing.
///
/// Cloning is cheap; every clone completes at the same moment. Dropping the
/// router also completes it.
#[derive(Clone)]
pub struct Exiting {
    signal: Shared<oneshot::Receiver<()>>,
}

impl Exiting {
    pub(crate) fn new(receiver: oneshot::Receiver<()>) -> Self {
        Self {
            signal: receiver.shared(),
        }
    }

    /// Whether the route has already been left
    pub fn has_exited(&self) -> bool {
        self.signal.peek().is_some() || self.signal.clone().now_or_never().is_some()
    }
}

impl Future for Exiting {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.signal.poll_unpin(cx).map(|_| ())
    }
}

impl fmt::Debug for Exiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exiting")
            .field("exited", &self.has_exited())
            .finish()
    }
}
