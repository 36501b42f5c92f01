//! Navigation host abstraction
//!
//! The navigator never talks to a browser directly. Everything it needs
//! (the current URL, the session history, confirmation prompts and the
//! stream of user navigation events) goes through [`NavigationHost`], so
//! the same coordinator drives a web view, a desktop shell, or the
//! in-memory [`MemoryHost`](crate::MemoryHost) used in tests.

use crate::context::RouteState;
use crate::error::NavigationError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State the navigator stores with each history entry it creates
#[derive(Clone)]
pub struct EntryState {
    /// Unique key identifying the entry in the navigator's ledger
    pub key: String,
    /// Full hash (prefix included) of the entry, when hash routing
    pub hash: Option<String>,
    /// Caller state passed to `navigate`
    pub state: Option<RouteState>,
}

impl EntryState {
    /// A fresh entry with a random key
    pub fn new(state: Option<RouteState>) -> Self {
        Self {
            key: uuid::Uuid::new_v4().to_string(),
            hash: None,
            state,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

impl fmt::Debug for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryState")
            .field("key", &self.key)
            .field("hash", &self.hash)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

/// Mouse button that triggered a link click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// A click on a link element, as reported by the host.
///
/// Clones share the prevented flag: preventing on one is visible on all.
#[derive(Debug, Clone, Default)]
pub struct LinkClick {
    /// Absolute `href` of the clicked link, if it has one
    pub href: Option<String>,
    pub target: Option<String>,
    pub download: bool,
    pub rel: Option<String>,
    pub button: MouseButton,
    pub meta_key: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    prevented: Arc<AtomicBool>,
}

impl LinkClick {
    /// A plain primary-button click on `href`
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, meta: bool, ctrl: bool, shift: bool, alt: bool) -> Self {
        self.meta_key = meta;
        self.ctrl_key = ctrl;
        self.shift_key = shift;
        self.alt_key = alt;
        self
    }

    /// Stop the host from following the link itself
    pub fn prevent_default(&self) {
        self.prevented.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.prevented.load(Ordering::SeqCst)
    }

    pub fn has_modifier(&self) -> bool {
        self.meta_key || self.ctrl_key || self.shift_key || self.alt_key
    }
}

/// Navigation events delivered by the host
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// The user (or `go`) moved through the session history
    PopState { entry: Option<EntryState> },
    /// The URL hash changed
    HashChange,
    /// A link was clicked
    LinkClicked(LinkClick),
}

/// Listener registered with [`NavigationHost::subscribe`].
///
/// The host must call it for every event and drive the returned future to
/// completion.
pub type HostListener = Arc<dyn Fn(HostEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Keeps a host listener registered; dropping it unsubscribes.
pub struct HostSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl HostSubscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for HostSubscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for HostSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The environment a [`Navigator`](crate::Navigator) drives
pub trait NavigationHost: Send + Sync + 'static {
    /// Current absolute URL
    fn href(&self) -> String;

    /// State of the current history entry
    fn entry_state(&self) -> Option<EntryState>;

    /// Add a history entry for `url` (resolved against the current URL).
    ///
    /// Fails with [`NavigationError::Host`] when the host refuses the URL,
    /// e.g. because it leaves the current origin.
    fn push_state(&self, entry: EntryState, url: &str) -> Result<(), NavigationError>;

    /// Overwrite the current history entry
    fn replace_state(&self, entry: EntryState, url: &str) -> Result<(), NavigationError>;

    /// Move `delta` entries through the history.
    ///
    /// Resolves to `true` once the resulting `PopState` has been delivered
    /// and every listener future for it has finished, or to `false` right
    /// away when there was nowhere to move (out of range, or `delta == 0`).
    fn go(&self, delta: isize) -> BoxFuture<'static, bool>;

    /// Ask the user to confirm leaving the page
    fn confirm(&self, message: &str) -> bool;

    fn subscribe(&self, listener: HostListener) -> HostSubscription;

    /// Scheme, host and port of the current URL, e.g. `https://example.com`
    fn origin(&self) -> String {
        url::Url::parse(&self.href())
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_default()
    }

    /// Fragment of the current URL with its `#`, or empty
    fn hash(&self) -> String {
        url::Url::parse(&self.href())
            .ok()
            .and_then(|url| url.fragment().map(|f| format!("#{}", f)))
            .filter(|hash| hash.len() > 1)
            .unwrap_or_default()
    }
}
