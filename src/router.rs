//! Router
//!
//! A [`Router`] owns an ordered list of wrapped middleware and dispatches
//! URLs through it. Routers are cheap handles: clones share the same
//! middleware list, options and listening state.
//!
//! # Example
//!
//! ```
//! use middle_router::{Flow, Router};
//!
//! let router: Router<String> = Router::new()
//!     .handle("/users/:id", |ctx, _next| {
//!         let id = ctx.params.get("id").unwrap_or_default().to_string();
//!         async move { Ok(Flow::Resolve(format!("user {}", id))) }
//!     })
//!     .handle("", |ctx, _next| {
//!         let path = ctx.path.clone();
//!         async move { Ok(Flow::Resolve(format!("not found: {}", path))) }
//!     });
//!
//! let page = pollster::block_on(router.route("/users/42", None)).unwrap();
//! assert_eq!(page.as_deref(), Some("user 42"));
//! ```

use crate::context::{Exiting, RouteContext, RouteState};
use crate::error::NavigationError;
use crate::events::{Emitter, SubscriptionId};
use crate::handler::{handler_fn, HandlerResult, RouteValue};
use crate::lifecycle::{BeforeExitEvent, ExitCheck};
use crate::location::{Location, ParseOptions};
use crate::middleware::{Layer, Middleware};
use crate::pipeline::{self, Chain, Next, RouteOutcome, Tail};
use crate::{debug_log, error_log, trace_log, warn_log};
use futures::channel::oneshot;
use futures::executor::ThreadPool;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use futures::task::{Spawn, SpawnExt};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll};
use url::Url;

/// Executor that runs dispatches in the background
pub type Spawner = Arc<dyn Spawn + Send + Sync>;

/// Process-wide pool used by routers without a configured spawner
fn default_spawner() -> Option<Spawner> {
    static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        match ThreadPool::builder().name_prefix("middle-router-").create() {
            Ok(pool) => Some(pool),
            Err(err) => {
                error_log!("cannot start dispatch pool: {}", err);
                None
            }
        }
    })
    .clone()
    .map(|pool| Arc::new(pool) as Spawner)
}

// ============================================================================
// Options
// ============================================================================

/// Router configuration
///
/// ```
/// use middle_router::RouterOptions;
///
/// let options = RouterOptions::new().hash("#!").route_links(false);
/// assert_eq!(options.hash_prefix(), Some("#!"));
/// assert!(!options.routes_links());
/// ```
#[derive(Clone)]
pub struct RouterOptions {
    hash: Option<String>,
    route_links: bool,
    parse_query: bool,
    base: Option<Url>,
    context: Option<Arc<dyn Any + Send + Sync>>,
    spawner: Option<Spawner>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            hash: None,
            route_links: true,
            parse_query: true,
            base: None,
            context: None,
            spawner: None,
        }
    }
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route on the part of the URL after `prefix` instead of the pathname.
    ///
    /// The prefix must start with `#`; anything else leaves hash routing off.
    pub fn hash(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix.starts_with('#') {
            self.hash = Some(prefix);
        } else {
            warn_log!("ignoring hash prefix '{}': must start with '#'", prefix);
            self.hash = None;
        }
        self
    }

    /// Hash routing with the plain `#` prefix
    pub fn hash_routing(self) -> Self {
        self.hash("#")
    }

    /// Intercept same-origin link clicks while listening (on by default)
    pub fn route_links(mut self, enabled: bool) -> Self {
        self.route_links = enabled;
        self
    }

    /// Parse the query string into `location.query` (on by default)
    pub fn parse_query(mut self, enabled: bool) -> Self {
        self.parse_query = enabled;
        self
    }

    /// Resolve relative URLs against `base`
    pub fn base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Application context shared with every middleware as `ctx.app()`
    pub fn context<C: Any + Send + Sync>(mut self, context: C) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Run dispatches on `spawner` instead of the shared default pool
    pub fn spawner<S: Spawn + Send + Sync + 'static>(mut self, spawner: S) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    pub fn hash_prefix(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn routes_links(&self) -> bool {
        self.route_links
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            parse_query: self.parse_query,
            hash_prefix: self.hash.clone(),
            base: self.base.clone(),
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("hash", &self.hash)
            .field("route_links", &self.route_links)
            .field("parse_query", &self.parse_query)
            .field("base", &self.base.as_ref().map(Url::as_str))
            .field("context", &self.context.is_some())
            .field("custom_spawner", &self.spawner.is_some())
            .finish()
    }
}

// ============================================================================
// Events
// ============================================================================

/// Notifications emitted by a router
pub enum RouterEvent<T: RouteValue> {
    /// A routing call began; emitted before `route` returns
    RoutingStarted {
        context: RouteContext<T>,
        routing: Routing<T>,
    },
    /// A top-level dispatch ran out of middleware
    Unmatched { path: String },
}

impl<T: RouteValue> fmt::Debug for RouterEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterEvent::RoutingStarted { context, routing } => f
                .debug_struct("RoutingStarted")
                .field("path", &context.path)
                .field("routing", &routing.id())
                .finish(),
            RouterEvent::Unmatched { path } => {
                f.debug_struct("Unmatched").field("path", path).finish()
            }
        }
    }
}

// ============================================================================
// Routing handle
// ============================================================================

/// Handle to an in-flight routing call.
///
/// Awaiting it yields the value of the middleware that resolved the route,
/// or `None`. The dispatch is already running on the router's spawner when
/// the handle is returned; dropping the handle does not stop it. Clones
/// share the same dispatch.
#[must_use = "the routing runs regardless; await the handle to get its outcome"]
pub struct Routing<T: RouteValue> {
    id: u64,
    outcome: Shared<BoxFuture<'static, RouteOutcome<T>>>,
}

impl<T: RouteValue> Routing<T> {
    /// Sequence number of the routing call on its router
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.peek().is_some()
    }

    /// Whether both handles refer to the same routing call
    pub fn same_as(&self, other: &Routing<T>) -> bool {
        self.id == other.id && self.outcome.ptr_eq(&other.outcome)
    }
}

impl<T: RouteValue> Clone for Routing<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            outcome: self.outcome.clone(),
        }
    }
}

impl<T: RouteValue> Future for Routing<T> {
    type Output = RouteOutcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.outcome.poll_unpin(cx)
    }
}

impl<T: RouteValue> fmt::Debug for Routing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routing")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

struct RouterInner<T: RouteValue> {
    options: RouterOptions,
    parse: ParseOptions,
    spawner: Option<Spawner>,
    chain: RwLock<Chain<T>>,
    routing: Mutex<Option<Routing<T>>>,
    exit_signal: Mutex<Option<oneshot::Sender<()>>>,
    listening: AtomicBool,
    seq: AtomicU64,
    events: Emitter<RouterEvent<T>>,
    before_exit: Emitter<BeforeExitEvent, Option<String>>,
}

/// URL router dispatching through an ordered middleware list
pub struct Router<T: RouteValue> {
    inner: Arc<RouterInner<T>>,
}

impl<T: RouteValue> Router<T> {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        let parse = options.parse_options();
        let spawner = options.spawner.clone().or_else(default_spawner);
        Self {
            inner: Arc::new(RouterInner {
                options,
                parse,
                spawner,
                chain: RwLock::new(Arc::new(Vec::new())),
                routing: Mutex::new(None),
                exit_signal: Mutex::new(None),
                listening: AtomicBool::new(false),
                seq: AtomicU64::new(0),
                events: Emitter::new(),
                before_exit: Emitter::new(),
            }),
        }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Append a middleware under `pattern` (`""` or `"*"` for every path).
    ///
    /// Registration during an in-flight dispatch is safe: the dispatch keeps
    /// walking the list it started with.
    pub fn use_middleware(self, pattern: &str, middleware: impl Into<Middleware<T>>) -> Self {
        let middleware = middleware.into();
        trace_log!("registering {:?} at '{}'", middleware, pattern);
        let layer = Layer::wrap(pattern, middleware);
        {
            let mut chain = self.inner.chain.write();
            Arc::make_mut(&mut chain).push(layer);
        }
        self
    }

    /// Append several middleware under the same pattern, in order
    pub fn use_all<I>(self, pattern: &str, middleware: I) -> Self
    where
        I: IntoIterator<Item = Middleware<T>>,
    {
        middleware
            .into_iter()
            .fold(self, |router, m| router.use_middleware(pattern, m))
    }

    /// Append an async handler matching whole paths
    pub fn handle<F, Fut>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(RouteContext<T>, Next<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<T>> + Send + 'static,
    {
        self.use_middleware(pattern, Middleware::handler(handler_fn(handler)))
    }

    /// Mount another router under a prefix
    pub fn mount(self, pattern: &str, router: Router<T>) -> Self {
        self.use_middleware(pattern, Middleware::Router(router))
    }

    /// Mount a middleware created by `factory` on first use
    pub fn lazy<F, Fut>(self, pattern: &str, factory: F) -> Self
    where
        F: FnOnce(RouteContext<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Middleware<T>, NavigationError>> + Send + 'static,
    {
        self.use_middleware(pattern, Middleware::lazy(factory))
    }

    /// Number of registered middleware
    pub fn len(&self) -> usize {
        self.inner.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn chain(&self) -> Chain<T> {
        Arc::clone(&self.inner.chain.read())
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatch `url` through the middleware list.
    ///
    /// Completes the previous route's `exiting` signal, emits
    /// [`RouterEvent::RoutingStarted`], records the returned handle as
    /// [`routing`](Self::routing) until it settles, and starts the dispatch
    /// on the router's spawner. A dispatch superseded by a later call still
    /// runs to completion. An unparsable URL yields a handle that fails with
    /// [`NavigationError::InvalidUrl`].
    pub fn route(&self, url: &str, state: Option<RouteState>) -> Routing<T> {
        let id = self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(previous) = self.inner.exit_signal.lock().take() {
            let _ = previous.send(());
        }

        let (dispatch, started) = match Location::parse(url, &self.inner.parse) {
            Ok(location) => {
                let exiting = self.is_listening().then(|| {
                    let (tx, rx) = oneshot::channel();
                    *self.inner.exit_signal.lock() = Some(tx);
                    Exiting::new(rx)
                });
                let ctx = RouteContext::root(
                    self.clone(),
                    location,
                    state,
                    exiting,
                    self.inner.options.context.clone(),
                );
                debug_log!("routing {} (#{})", ctx.location.href, id);
                let dispatch = pipeline::run(self.chain(), 0, ctx.clone(), Tail::Unmatched);
                (dispatch, Some(ctx))
            }
            Err(err) => {
                warn_log!("cannot route: {}", err);
                (future::ready(Err(err)).boxed(), None)
            }
        };

        let router = Arc::downgrade(&self.inner);
        let outcome = async move {
            let outcome = dispatch.await;
            if let Err(err) = &outcome {
                error_log!("routing #{} failed: {}", id, err);
            }
            settle(&router, id);
            outcome
        }
        .boxed()
        .shared();

        let routing = Routing { id, outcome };
        *self.inner.routing.lock() = Some(routing.clone());

        if let Some(context) = started {
            self.inner.events.emit(&mut RouterEvent::RoutingStarted {
                context,
                routing: routing.clone(),
            });
        }
        self.spawn_dispatch(&routing);
        routing
    }

    fn spawn_dispatch(&self, routing: &Routing<T>) {
        let Some(spawner) = &self.inner.spawner else {
            warn_log!("no spawner; routing #{} runs when awaited", routing.id);
            return;
        };
        let task = routing.outcome.clone().map(|_| ());
        if let Err(err) = spawner.spawn(task) {
            warn_log!("cannot spawn routing #{}: {}; it runs when awaited", routing.id, err);
        }
    }

    /// The most recent routing call, while it has not settled
    pub fn routing(&self) -> Option<Routing<T>> {
        self.inner.routing.lock().clone()
    }

    pub(crate) fn report_unmatched(&self, path: &str) {
        error_log!("no route matches {}", path);
        self.inner.events.emit(&mut RouterEvent::Unmatched {
            path: path.to_string(),
        });
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Subscribe to routing notifications
    pub fn on_event<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&mut RouterEvent<T>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    pub fn off_event(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------------
    // Navigation state
    // ------------------------------------------------------------------------

    /// Whether a navigator is currently driving this router
    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    pub(crate) fn set_listening(&self, listening: bool) {
        self.inner.listening.store(listening, Ordering::SeqCst);
    }

    pub(crate) fn before_exit_handlers(&self) -> &Emitter<BeforeExitEvent, Option<String>> {
        &self.inner.before_exit
    }

    /// Ask every before-exit handler whether leaving for `to` is fine.
    pub(crate) fn check_before_exit(&self, to: &str, default_message: &str) -> ExitCheck {
        let mut event = BeforeExitEvent::new(to);
        let answers = self.inner.before_exit.emit(&mut event);
        ExitCheck::evaluate(event, answers, default_message)
    }

    pub(crate) fn clear_before_exit(&self) {
        self.inner.before_exit.clear();
    }

    /// Whether both handles refer to the same router
    pub fn ptr_eq(&self, other: &Router<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Forget `id` as the current routing if nothing newer replaced it.
fn settle<T: RouteValue>(router: &Weak<RouterInner<T>>, id: u64) {
    let Some(inner) = router.upgrade() else {
        return;
    };
    let mut current = inner.routing.lock();
    if current.as_ref().is_some_and(|routing| routing.id == id) {
        *current = None;
    }
}

impl<T: RouteValue> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RouteValue> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RouteValue> PartialEq for Router<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: RouteValue> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("middleware", &self.len())
            .field("listening", &self.is_listening())
            .field("options", &self.inner.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Flow;
    use futures::channel::mpsc;
    use futures::StreamExt;

    type Gate = Arc<Mutex<Option<oneshot::Receiver<()>>>>;

    fn block<F: Future>(f: F) -> F::Output {
        pollster::block_on(f)
    }

    fn gate() -> (oneshot::Sender<()>, Gate) {
        let (open, wait) = oneshot::channel();
        (open, Arc::new(Mutex::new(Some(wait))))
    }

    // Resolves with `value` once the gate opens
    fn gated(router: Router<u8>, pattern: &str, gate: Gate, value: u8) -> Router<u8> {
        router.handle(pattern, move |_, _| {
            let wait = gate.lock().take();
            async move {
                if let Some(wait) = wait {
                    let _ = wait.await;
                }
                Ok(Flow::Resolve(value))
            }
        })
    }

    #[test]
    fn test_registration_appends_in_order() {
        let router: Router<u8> = Router::new()
            .handle("/a", |_, _| async { Ok(Flow::Resolve(1)) })
            .use_all(
                "/b",
                [
                    Middleware::handler(handler_fn(|_, _| async { Ok(Flow::Continue) })),
                    Middleware::handler(handler_fn(|_, _| async { Ok(Flow::Resolve(2)) })),
                ],
            );

        assert_eq!(router.len(), 3);
        assert_eq!(block(router.route("/b", None)).unwrap(), Some(2));
    }

    #[test]
    fn test_routing_handle_is_cleared_after_settling() {
        let (open, wait) = gate();
        let router = gated(Router::new(), "", wait, 1);

        let routing = router.route("/", None);
        let current = router.routing().expect("routing in flight");
        assert!(current.same_as(&routing));
        assert!(!routing.is_settled());

        open.send(()).unwrap();
        assert_eq!(block(routing.clone()).unwrap(), Some(1));
        assert!(routing.is_settled());
        assert!(router.routing().is_none());
    }

    #[test]
    fn test_stale_routing_does_not_clear_newer_one() {
        let (open, wait) = gate();
        let router = gated(Router::new(), "/slow", wait, 2)
            .handle("", |_, _| async { Ok(Flow::Resolve(1)) });

        let first = router.route("/", None);
        let second = router.route("/slow", None);
        assert_eq!(block(first).unwrap(), Some(1));

        let current = router.routing().expect("second still in flight");
        assert!(current.same_as(&second));

        open.send(()).unwrap();
        assert_eq!(block(second).unwrap(), Some(2));
        assert!(router.routing().is_none());
    }

    #[test]
    fn test_dropped_handle_still_dispatches() {
        let (hits, mut seen) = mpsc::unbounded();
        let router: Router<u8> = Router::new().handle("", move |ctx, _| {
            let _ = hits.unbounded_send(ctx.path.clone());
            async { Ok(Flow::Resolve(1)) }
        });

        let _ = router.route("/first", None);
        let _ = router.route("/second", None);

        let mut paths = vec![block(seen.next()), block(seen.next())];
        paths.sort();
        assert_eq!(paths, [Some("/first".to_string()), Some("/second".to_string())]);

        if let Some(pending) = router.routing() {
            block(pending).unwrap();
        }
        assert!(router.routing().is_none());
    }

    #[test]
    fn test_custom_spawner_runs_dispatch() {
        let pool = ThreadPool::new().unwrap();
        let (hits, mut seen) = mpsc::unbounded();
        let router: Router<u8> = Router::with_options(RouterOptions::new().spawner(pool))
            .handle("", move |_, _| {
                let _ = hits.unbounded_send(());
                async { Ok(Flow::Resolve(1)) }
            });

        let _ = router.route("/", None);
        assert_eq!(block(seen.next()), Some(()));
    }

    #[test]
    fn test_invalid_url_fails_the_routing() {
        let router: Router<u8> = Router::new();
        let err = block(router.route("http://[::1", None)).unwrap_err();
        assert!(matches!(err, NavigationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_routing_started_event() {
        let router: Router<u8> = Router::new().handle("", |_, _| async { Ok(Flow::Resolve(1)) });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        router.on_event(move |event| {
            if let RouterEvent::RoutingStarted { context, routing } = event {
                log.lock().push((context.path.clone(), routing.id()));
            }
        });

        let routing = router.route("/x/y", None);
        assert_eq!(seen.lock().as_slice(), [("/x/y".to_string(), routing.id())]);
    }

    #[test]
    fn test_unmatched_event() {
        let router: Router<u8> = Router::new().handle("/a", |_, _| async { Ok(Flow::Resolve(1)) });
        let unmatched = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&unmatched);
        router.on_event(move |event| {
            if let RouterEvent::Unmatched { path } = event {
                log.lock().push(path.clone());
            }
        });

        assert_eq!(block(router.route("/b", None)).unwrap(), None);
        assert_eq!(unmatched.lock().as_slice(), ["/b".to_string()]);
    }

    #[test]
    fn test_exiting_only_while_listening() {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&exits);
        let router: Router<u8> = Router::new().handle("", move |ctx, _| {
            log.lock().push(ctx.exiting.clone());
            async { Ok(Flow::Resolve(0)) }
        });

        block(router.route("/", None)).unwrap();
        router.set_listening(true);
        block(router.route("/", None)).unwrap();

        let first_exit = {
            let exits = exits.lock();
            assert!(exits[0].is_none());
            exits[1].clone().expect("exiting while listening")
        };
        assert!(!first_exit.has_exited());

        block(router.route("/next", None)).unwrap();
        assert!(first_exit.has_exited());
    }

    #[test]
    fn test_invalid_hash_prefix_is_ignored() {
        let options = RouterOptions::new().hash("!");
        assert_eq!(options.hash_prefix(), None);
        assert_eq!(RouterOptions::new().hash_routing().hash_prefix(), Some("#"));
    }

    #[test]
    fn test_app_context_is_shared() {
        let router: Router<String> =
            Router::with_options(RouterOptions::new().context("shared".to_string()))
                .handle("", |ctx, _| {
                    let app = ctx.app::<String>().cloned().unwrap_or_default();
                    async move { Ok(Flow::Resolve(app)) }
                });

        assert_eq!(block(router.route("/", None)).unwrap().as_deref(), Some("shared"));
    }

    #[test]
    fn test_clones_share_state() {
        let router: Router<u8> = Router::new();
        let clone = router.clone().handle("", |_, _| async { Ok(Flow::Resolve(3)) });

        assert_eq!(router, clone);
        assert_eq!(router.len(), 1);
    }
}
