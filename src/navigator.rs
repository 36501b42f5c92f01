//! Navigation coordinator
//!
//! A [`Navigator`] binds a [`Router`] to a [`NavigationHost`]. While started
//! it:
//!
//! - routes the host's current URL;
//! - routes every history pop, hash change and intercepted link click;
//! - stamps each history entry it creates with a unique key and keeps a
//!   [`HistoryLedger`] of those keys;
//! - asks before-exit handlers before leaving a route, and undoes a refused
//!   history move by going back the way the host came.
//!
//! Navigations take turns: a navigation requested while another one is
//! confirming or committing its history entry waits for it. The turn ends
//! once the routing has started, so a handler may itself navigate (a
//! redirect) and await the result.
//!
//! # Example
//!
//! ```
//! use middle_router::{Flow, MemoryHost, Navigator, Router};
//! use std::sync::Arc;
//!
//! let router: Router<&'static str> = Router::new()
//!     .handle("/", |_, _| async { Ok(Flow::Resolve("home")) })
//!     .handle("/about", |_, _| async { Ok(Flow::Resolve("about")) });
//!
//! let host = Arc::new(MemoryHost::new("http://localhost/"));
//! let navigator = Navigator::new(router, host.clone());
//!
//! pollster::block_on(async {
//!     assert_eq!(navigator.start().await.unwrap(), Some("home"));
//!
//!     let result = navigator.navigate("/about", None).unwrap().await.unwrap();
//!     assert_eq!(result.value(), Some(&"about"));
//!     assert_eq!(host.len(), 2);
//! });
//! ```

use crate::context::RouteState;
use crate::error::{NavigationError, NavigationResult};
use crate::handler::RouteValue;
use crate::history::HistoryLedger;
use crate::host::{EntryState, HostEvent, HostListener, HostSubscription, LinkClick, MouseButton, NavigationHost};
use crate::lifecycle::{ExitCheck, DEFAULT_EXIT_MESSAGE};
use crate::router::{Router, Routing};
use crate::{debug_log, info_log, trace_log, warn_log};
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use url::Url;

/// Future returned by [`Navigator::navigate`]
pub type NavigationFuture<T> =
    BoxFuture<'static, Result<NavigationResult<T>, NavigationError>>;

/// Future returned by history moves; `None` when the history did not move
pub type HistoryFuture<T> =
    BoxFuture<'static, Result<Option<NavigationResult<T>>, NavigationError>>;

type ConfirmFn = Arc<dyn Fn(String) -> BoxFuture<'static, bool> + Send + Sync>;

/// Navigator configuration
#[derive(Clone)]
pub struct NavigatorOptions {
    confirm: Option<ConfirmFn>,
    default_message: String,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            confirm: None,
            default_message: DEFAULT_EXIT_MESSAGE.to_string(),
        }
    }
}

impl NavigatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for exit confirmation with `confirm` instead of the host prompt
    pub fn confirm<F, Fut>(mut self, confirm: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.confirm = Some(Arc::new(move |message| confirm(message).boxed()));
        self
    }

    /// Prompt used when a handler refused without a message
    pub fn default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }
}

impl fmt::Debug for NavigatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorOptions")
            .field("custom_confirm", &self.confirm.is_some())
            .field("default_message", &self.default_message)
            .finish()
    }
}

struct NavigatorInner<T: RouteValue> {
    router: Router<T>,
    host: Arc<dyn NavigationHost>,
    options: NavigatorOptions,
    ledger: Mutex<HistoryLedger>,
    subscription: Mutex<Option<HostSubscription>>,
    ignore_pop: AtomicBool,
    turn: futures::lock::Mutex<()>,
    last_href: Mutex<String>,
    pop_outcome: Mutex<Option<Result<NavigationResult<T>, NavigationError>>>,
}

/// Drives a router from a navigation host
pub struct Navigator<T: RouteValue> {
    inner: Arc<NavigatorInner<T>>,
}

impl<T: RouteValue> Navigator<T> {
    pub fn new(router: Router<T>, host: Arc<dyn NavigationHost>) -> Self {
        Self::with_options(router, host, NavigatorOptions::default())
    }

    pub fn with_options(
        router: Router<T>,
        host: Arc<dyn NavigationHost>,
        options: NavigatorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(NavigatorInner {
                router,
                host,
                options,
                ledger: Mutex::new(HistoryLedger::new()),
                subscription: Mutex::new(None),
                ignore_pop: AtomicBool::new(false),
                turn: futures::lock::Mutex::new(()),
                last_href: Mutex::new(String::new()),
                pop_outcome: Mutex::new(None),
            }),
        }
    }

    pub fn router(&self) -> &Router<T> {
        &self.inner.router
    }

    pub fn is_listening(&self) -> bool {
        self.inner.subscription.lock().is_some()
    }

    /// Snapshot of the keys of the entries created while listening
    pub fn history(&self) -> HistoryLedger {
        self.inner.ledger.lock().clone()
    }

    /// Start listening and route the host's current URL.
    ///
    /// Starting an already started navigator restarts it: the previous
    /// host subscription is dropped first, so there is only ever one, and
    /// before-exit handlers from the previous session are discarded.
    pub fn start(&self) -> Routing<T> {
        let inner = &self.inner;
        let previous = inner.subscription.lock().take();
        if previous.is_some() {
            debug_log!("navigator already listening, restarting");
        }
        drop(previous);

        inner.router.set_listening(true);
        inner.router.clear_before_exit();
        *inner.ledger.lock() = HistoryLedger::new();
        *inner.pop_outcome.lock() = None;
        inner.ignore_pop.store(false, Ordering::SeqCst);

        let href = inner.host.href();
        let state = inner.host.entry_state().and_then(|entry| entry.state);
        if let Err(err) = inner.stamp_current(&inner.path_from_href(&href), state.clone()) {
            warn_log!("cannot stamp start entry: {}", err);
        }

        let subscription = inner.host.subscribe(NavigatorInner::listener(Arc::downgrade(inner)));
        *inner.subscription.lock() = Some(subscription);

        let href = inner.host.href();
        *inner.last_href.lock() = href.clone();
        debug_log!("navigator listening at {}", href);
        inner.router.route(&inner.route_target(&href), state)
    }

    /// Stop listening. Stopping a stopped navigator does nothing.
    pub fn stop(&self) {
        let subscription = self.inner.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
            self.inner.router.set_listening(false);
            self.inner.router.clear_before_exit();
            debug_log!("navigator stopped");
        }
    }

    /// Push a history entry for `path` and route it.
    ///
    /// Fails right away with [`NavigationError::NotListening`] when stopped.
    /// The returned future resolves to `Blocked` when a before-exit handler
    /// refused and the user did not confirm; nothing is pushed then.
    pub fn navigate(
        &self,
        path: &str,
        state: Option<RouteState>,
    ) -> Result<NavigationFuture<T>, NavigationError> {
        self.ensure_listening()?;
        let inner = Arc::clone(&self.inner);
        Ok(inner.navigate_now(path.to_string(), state).boxed())
    }

    /// Overwrite the current history entry without routing
    pub fn replace(&self, path: &str, state: Option<RouteState>) -> Result<(), NavigationError> {
        self.ensure_listening()?;
        self.inner.stamp_current(path, state)?;
        *self.inner.last_href.lock() = self.inner.host.href();
        Ok(())
    }

    pub fn back(&self) -> Result<HistoryFuture<T>, NavigationError> {
        self.go(-1)
    }

    pub fn forward(&self) -> Result<HistoryFuture<T>, NavigationError> {
        self.go(1)
    }

    /// Move `delta` entries through the host history and report how the
    /// resulting pop was handled.
    pub fn go(&self, delta: isize) -> Result<HistoryFuture<T>, NavigationError> {
        self.ensure_listening()?;
        let inner = Arc::clone(&self.inner);
        Ok(async move {
            *inner.pop_outcome.lock() = None;
            if !inner.host.go(delta).await {
                return Ok(None);
            }
            let outcome = inner.pop_outcome.lock().take();
            outcome.transpose()
        }
        .boxed())
    }

    fn ensure_listening(&self) -> Result<(), NavigationError> {
        if self.is_listening() {
            Ok(())
        } else {
            Err(NavigationError::NotListening)
        }
    }
}

impl<T: RouteValue> NavigatorInner<T> {
    fn listener(navigator: Weak<Self>) -> HostListener {
        Arc::new(move |event| match navigator.upgrade() {
            Some(inner) => inner.on_event(event),
            None => future::ready(()).boxed(),
        })
    }

    fn on_event(self: Arc<Self>, event: HostEvent) -> BoxFuture<'static, ()> {
        match event {
            HostEvent::PopState { entry } => {
                // Set when the pop is our own revert of a refused move
                if self.ignore_pop.swap(false, Ordering::SeqCst) {
                    trace_log!("ignoring reverting pop");
                    return future::ready(()).boxed();
                }
                self.pop(entry)
            }
            HostEvent::HashChange => {
                let hash_routing = self.router.options().hash_prefix().is_some();
                if !hash_routing || self.host.href() == *self.last_href.lock() {
                    return future::ready(()).boxed();
                }
                let entry = self.host.entry_state();
                self.pop(entry)
            }
            HostEvent::LinkClicked(click) => {
                let Some(path) = self.intercept(&click) else {
                    return future::ready(()).boxed();
                };
                click.prevent_default();
                async move {
                    if let Err(err) = self.navigate_now(path, None).await {
                        warn_log!("link navigation failed: {}", err);
                    }
                }
                .boxed()
            }
        }
    }

    fn pop(self: Arc<Self>, entry: Option<EntryState>) -> BoxFuture<'static, ()> {
        async move {
            let outcome = Arc::clone(&self).handle_pop(entry).await;
            *self.pop_outcome.lock() = Some(outcome);
        }
        .boxed()
    }

    async fn navigate_now(
        self: Arc<Self>,
        path: String,
        state: Option<RouteState>,
    ) -> Result<NavigationResult<T>, NavigationError> {
        let routing = {
            let _turn = self.turn.lock().await;
            if let Err(reason) = self.confirm_exit(&path).await {
                return Ok(NavigationResult::Blocked { reason });
            }

            self.push(&path, state.clone())?;
            self.router.clear_before_exit();
            let href = self.host.href();
            *self.last_href.lock() = href.clone();
            self.router.route(&self.route_target(&href), state)
        };

        let value = routing.await?;
        Ok(NavigationResult::from_routed(path, value))
    }

    async fn handle_pop(
        self: Arc<Self>,
        entry: Option<EntryState>,
    ) -> Result<NavigationResult<T>, NavigationError> {
        let (path, routing) = {
            let _turn = self.turn.lock().await;
            let href = self.host.href();
            let (target, moved) = {
                let ledger = self.ledger.lock();
                let key = entry.as_ref().map(|entry| entry.key.as_str());
                // An entry we never stamped was made by the host after ours
                let target = ledger.position(key);
                let moved = ledger.delta_to(target.unwrap_or(ledger.index() + 1));
                (target, moved)
            };

            if let Err(reason) = self.confirm_exit(&self.path_from_href(&href)).await {
                self.revert(-moved).await;
                *self.last_href.lock() = self.host.href();
                return Ok(NavigationResult::Blocked { reason });
            }

            match target {
                Some(target) => self.ledger.lock().set_index(target),
                None => self.adopt_current(),
            }
            self.router.clear_before_exit();
            if let Some(entry) = &entry {
                self.restore_hash(entry);
            }

            let href = self.host.href();
            *self.last_href.lock() = href.clone();
            let state = entry.and_then(|entry| entry.state);
            let routing = self.router.route(&self.route_target(&href), state);
            (self.path_from_href(&href), routing)
        };

        let value = routing.await?;
        Ok(NavigationResult::from_routed(path, value))
    }

    /// Undo a refused history move. The pop the host fires for it is
    /// skipped; if the host cannot move there is no pop to skip.
    async fn revert(&self, delta: isize) {
        if delta == 0 {
            return;
        }
        info_log!("reverting history move by {}", delta);
        self.ignore_pop.store(true, Ordering::SeqCst);
        if !self.host.go(delta).await {
            warn_log!("host could not revert history move by {}", delta);
            self.ignore_pop.store(false, Ordering::SeqCst);
        }
    }

    /// Run the before-exit handlers for leaving to `to`. `Err` carries the
    /// prompt the user declined.
    async fn confirm_exit(&self, to: &str) -> Result<(), String> {
        let check = self
            .router
            .check_before_exit(to, &self.options.default_message);
        if let ExitCheck::Confirm { message } = check {
            let confirmed = match &self.options.confirm {
                Some(confirm) => confirm(message.clone()).await,
                None => self.host.confirm(&message),
            };
            if !confirmed {
                info_log!("navigation to {} refused", to);
                return Err(message);
            }
        }
        Ok(())
    }

    fn push(&self, path: &str, state: Option<RouteState>) -> Result<(), NavigationError> {
        let (entry, url) = self.entry_for(path, state);
        let key = entry.key.clone();
        self.host.push_state(entry, &url)?;
        self.ledger.lock().push(key);
        Ok(())
    }

    fn stamp_current(&self, path: &str, state: Option<RouteState>) -> Result<(), NavigationError> {
        let (entry, url) = self.entry_for(path, state);
        let key = entry.key.clone();
        self.host.replace_state(entry, &url)?;
        self.ledger.lock().replace(key);
        Ok(())
    }

    /// Record an entry the host created on its own (a hash edit) as a new
    /// entry after the current one, stamping it so later pops find it.
    fn adopt_current(&self) {
        let href = self.host.href();
        let mut entry = EntryState::new(None);
        if self.router.options().hash_prefix().is_some() {
            entry = entry.with_hash(self.host.hash());
        }
        let key = entry.key.clone();
        if let Err(err) = self.host.replace_state(entry, &href) {
            warn_log!("cannot stamp entry {}: {}", href, err);
        }
        self.ledger.lock().push(key);
    }

    fn entry_for(&self, path: &str, state: Option<RouteState>) -> (EntryState, String) {
        let entry = EntryState::new(state);
        match self.router.options().hash_prefix() {
            Some(prefix) => {
                let hash = format!("{}{}", prefix, path);
                (entry.with_hash(hash.clone()), hash)
            }
            None => (entry, path.to_string()),
        }
    }

    /// Put back the hash recorded with `entry` if the host lost it
    fn restore_hash(&self, entry: &EntryState) {
        if self.router.options().hash_prefix().is_none() {
            return;
        }
        if let Some(stored) = &entry.hash {
            if self.host.hash() != *stored {
                trace_log!("restoring hash {}", stored);
                if let Err(err) = self.host.replace_state(entry.clone(), stored) {
                    warn_log!("cannot restore hash {}: {}", stored, err);
                }
            }
        }
    }

    /// Routable path of an absolute href: the part inside the hash when hash
    /// routing, the origin-relative part otherwise.
    fn path_from_href(&self, href: &str) -> String {
        if let Some(prefix) = self.router.options().hash_prefix() {
            if let Some(start) = href.find('#') {
                let inner: String = href[start..].split(prefix).skip(1).collect();
                return if inner.is_empty() { "/".to_string() } else { inner };
            }
        }
        let origin = self.host.origin();
        match href.strip_prefix(origin.as_str()) {
            Some(path) if !origin.is_empty() && path.starts_with('/') => path.to_string(),
            Some("") if !origin.is_empty() => "/".to_string(),
            _ => href.to_string(),
        }
    }

    /// What to hand the router for `href`
    fn route_target(&self, href: &str) -> String {
        if self.router.options().hash_prefix().is_some() {
            self.path_from_href(href)
        } else {
            href.to_string()
        }
    }

    /// Path to navigate to for a click, or `None` to let the host follow it
    fn intercept(&self, click: &LinkClick) -> Option<String> {
        if !self.router.options().routes_links()
            || click.default_prevented()
            || click.button != MouseButton::Primary
            || click.has_modifier()
            || click.download
            || click.target.as_deref().is_some_and(|t| !t.is_empty())
            || click.rel.as_deref().is_some_and(|r| !r.is_empty())
        {
            return None;
        }

        let current = Url::parse(&self.host.href()).ok()?;
        let target = current.join(click.href.as_deref()?).ok()?;
        if target.origin() != current.origin() {
            trace_log!("not intercepting cross-origin link {}", target);
            return None;
        }
        Some(self.path_from_href(target.as_str()))
    }
}

impl<T: RouteValue> Drop for NavigatorInner<T> {
    fn drop(&mut self) {
        if self.subscription.get_mut().take().is_some() {
            self.router.set_listening(false);
        }
    }
}

impl<T: RouteValue> Clone for Navigator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RouteValue> fmt::Debug for Navigator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("listening", &self.is_listening())
            .field("history", &*self.inner.ledger.lock())
            .field("options", &self.inner.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Flow;
    use crate::memory::MemoryHost;
    use crate::router::RouterOptions;

    fn navigator(router: Router<String>, url: &str) -> (Navigator<String>, Arc<MemoryHost>) {
        let host = Arc::new(MemoryHost::new(url));
        (Navigator::new(router, host.clone()), host)
    }

    fn echo() -> Router<String> {
        echo_with(RouterOptions::new())
    }

    fn echo_with(options: RouterOptions) -> Router<String> {
        Router::with_options(options).handle("", |ctx, _| {
            let path = ctx.path.clone();
            async move { Ok(Flow::Resolve(path)) }
        })
    }

    #[test]
    fn test_operations_require_listening() {
        let (navigator, _host) = navigator(echo(), "http://localhost/");
        assert!(navigator.navigate("/a", None).err().is_some_and(|e| e.is_not_listening()));
        assert!(navigator.replace("/a", None).is_err());
        assert!(navigator.back().is_err());
        assert!(navigator.forward().is_err());
    }

    #[test]
    fn test_start_stamps_current_entry() {
        let (navigator, host) = navigator(echo(), "http://localhost/start?x=1");
        let value = pollster::block_on(navigator.start()).unwrap();

        assert_eq!(value.as_deref(), Some("/start"));
        assert_eq!(host.href(), "http://localhost/start?x=1");
        let key = host.entry_state().map(|e| e.key).unwrap_or_default();
        assert!(!key.is_empty());
        assert_eq!(navigator.history().current_key(), key);
    }

    #[test]
    fn test_start_twice_keeps_one_listener() {
        let (navigator, host) = navigator(echo(), "http://localhost/");
        pollster::block_on(navigator.start()).unwrap();
        pollster::block_on(navigator.start()).unwrap();
        assert_eq!(host.listener_count(), 1);

        navigator.stop();
        navigator.stop();
        assert_eq!(host.listener_count(), 0);
        assert!(!navigator.router().is_listening());
    }

    #[test]
    fn test_path_from_href() {
        let (plain, _) = navigator(echo(), "http://localhost/");
        assert_eq!(plain.inner.path_from_href("http://localhost/a/b?c#d"), "/a/b?c#d");
        assert_eq!(plain.inner.path_from_href("http://localhost"), "/");

        let hashed = Router::with_options(RouterOptions::new().hash("#$!"));
        let (hashed, _) = navigator(hashed, "http://localhost/");
        assert_eq!(
            hashed.inner.path_from_href("http://localhost/path#$!/hash/route"),
            "/hash/route"
        );
    }

    #[test]
    fn test_intercept_filters_clicks() {
        let (navigator, _host) = navigator(echo(), "http://localhost/page");
        let inner = &navigator.inner;

        assert_eq!(
            inner.intercept(&LinkClick::new("http://localhost/a?b")).as_deref(),
            Some("/a?b")
        );
        assert_eq!(inner.intercept(&LinkClick::new("/rel")).as_deref(), Some("/rel"));
        assert!(inner.intercept(&LinkClick::new("https://elsewhere.test/")).is_none());
        assert!(inner
            .intercept(&LinkClick::new("/a").with_button(MouseButton::Middle))
            .is_none());
        assert!(inner
            .intercept(&LinkClick::new("/a").with_modifiers(true, false, false, false))
            .is_none());
        assert!(inner.intercept(&LinkClick::new("/a").with_target("_blank")).is_none());
        assert!(inner.intercept(&LinkClick::new("/a").with_rel("external")).is_none());
        assert!(inner.intercept(&LinkClick::new("/a").with_download()).is_none());

        let prevented = LinkClick::new("/a");
        prevented.prevent_default();
        assert!(inner.intercept(&prevented).is_none());
    }

    #[test]
    fn test_unknown_entry_is_adopted_after_current() {
        let router = echo_with(RouterOptions::new().hash("#"));
        let (navigator, host) = navigator(router, "http://localhost/#/");
        pollster::block_on(navigator.start()).unwrap();

        pollster::block_on(host.set_hash("#/typed"));

        let history = navigator.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), 1);
        let stamped = host.entry_state().unwrap();
        assert_eq!(history.current_key(), stamped.key);
        assert_eq!(stamped.hash.as_deref(), Some("#/typed"));
    }

    #[test]
    fn test_revert_that_cannot_move_does_not_swallow_next_pop() {
        let (navigator, _host) = navigator(echo(), "http://localhost/");
        pollster::block_on(navigator.start()).unwrap();

        pollster::block_on(navigator.inner.revert(-3));
        assert!(!navigator.inner.ignore_pop.load(Ordering::SeqCst));

        pollster::block_on(navigator.inner.revert(0));
        assert!(!navigator.inner.ignore_pop.load(Ordering::SeqCst));
    }
}
