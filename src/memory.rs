//! In-memory navigation host
//!
//! [`MemoryHost`] keeps a session history stack the way a browser tab does
//! (push truncates forward entries, `go` moves the cursor and fires a pop)
//! and lets tests script the user: clicking links, editing the hash,
//! answering confirmation prompts.

use crate::error::NavigationError;
use crate::host::{EntryState, HostEvent, HostListener, HostSubscription, LinkClick, NavigationHost};
use crate::trace_log;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    state: Option<EntryState>,
}

#[derive(Debug)]
struct Stack {
    entries: Vec<Entry>,
    current: usize,
}

impl Stack {
    fn current(&self) -> &Entry {
        &self.entries[self.current]
    }

    /// Resolve `url` against the current entry, refusing to leave its
    /// origin the way a browser refuses `pushState` to another origin.
    fn resolve(&self, url: &str) -> Result<String, NavigationError> {
        let host_error = |message: String| NavigationError::Host { message };
        let base = Url::parse(&self.current().url)
            .map_err(|err| host_error(format!("current url is invalid: {}", err)))?;
        let resolved = base
            .join(url)
            .map_err(|err| host_error(format!("cannot resolve '{}': {}", url, err)))?;
        if resolved.origin() != base.origin() {
            return Err(host_error(format!(
                "'{}' is not on origin {}",
                resolved,
                base.origin().ascii_serialization()
            )));
        }
        Ok(resolved.into())
    }

    fn push(&mut self, url: String, state: Option<EntryState>) {
        self.entries.truncate(self.current + 1);
        self.entries.push(Entry { url, state });
        self.current += 1;
    }
}

type Listeners = Arc<Mutex<Vec<(u64, HostListener)>>>;

/// Navigation host backed by an in-memory history stack
pub struct MemoryHost {
    stack: Mutex<Stack>,
    listeners: Listeners,
    next_listener: AtomicU64,
    confirm_answer: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl MemoryHost {
    /// A host whose only history entry is `url` (absolute)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            stack: Mutex::new(Stack {
                entries: vec![Entry {
                    url: url.into(),
                    state: None,
                }],
                current: 0,
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(1),
            confirm_answer: AtomicBool::new(true),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// What the simulated user answers to confirmation prompts (default yes)
    pub fn set_confirm_answer(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    /// Messages of every confirmation prompt shown so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Number of history entries
    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the current entry
    pub fn position(&self) -> usize {
        self.stack.lock().current
    }

    /// URLs of every history entry, oldest first
    pub fn urls(&self) -> Vec<String> {
        self.stack
            .lock()
            .entries
            .iter()
            .map(|entry| entry.url.clone())
            .collect()
    }

    /// Overwrite the current URL without notifying anyone
    pub fn set_href(&self, url: &str) -> Result<(), NavigationError> {
        let mut stack = self.stack.lock();
        let url = stack.resolve(url)?;
        let current = stack.current;
        stack.entries[current] = Entry { url, state: None };
        Ok(())
    }

    /// Simulate a click on a link; resolves to whether the default action
    /// was prevented.
    pub fn click(&self, click: LinkClick) -> BoxFuture<'static, bool> {
        let delivered = deliver(&self.listeners, HostEvent::LinkClicked(click.clone()));
        async move {
            delivered.await;
            click.default_prevented()
        }
        .boxed()
    }

    /// Simulate the user editing the hash: a new entry without state, then
    /// a pop followed by a hash change.
    pub fn set_hash(&self, hash: &str) -> BoxFuture<'static, ()> {
        {
            let mut stack = self.stack.lock();
            match stack.resolve(hash) {
                Ok(url) => stack.push(url, None),
                Err(err) => {
                    trace_log!("ignoring hash edit: {}", err);
                    return future::ready(()).boxed();
                }
            }
        }
        let pop = deliver(&self.listeners, HostEvent::PopState { entry: None });
        let listeners = Arc::clone(&self.listeners);
        async move {
            pop.await;
            deliver(&listeners, HostEvent::HashChange).await;
        }
        .boxed()
    }
}

/// Call every listener with `event` now, then drive their futures in order.
fn deliver(listeners: &Listeners, event: HostEvent) -> BoxFuture<'static, ()> {
    let snapshot: Vec<HostListener> = listeners
        .lock()
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect();
    let pending: Vec<_> = snapshot
        .iter()
        .map(|listener| listener(event.clone()))
        .collect();
    async move {
        for fut in pending {
            fut.await;
        }
    }
    .boxed()
}

impl NavigationHost for MemoryHost {
    fn href(&self) -> String {
        self.stack.lock().current().url.clone()
    }

    fn entry_state(&self) -> Option<EntryState> {
        self.stack.lock().current().state.clone()
    }

    fn push_state(&self, entry: EntryState, url: &str) -> Result<(), NavigationError> {
        let mut stack = self.stack.lock();
        let url = stack.resolve(url)?;
        trace_log!("push {}", url);
        stack.push(url, Some(entry));
        Ok(())
    }

    fn replace_state(&self, entry: EntryState, url: &str) -> Result<(), NavigationError> {
        let mut stack = self.stack.lock();
        let url = stack.resolve(url)?;
        trace_log!("replace {}", url);
        let current = stack.current;
        stack.entries[current] = Entry {
            url,
            state: Some(entry),
        };
        Ok(())
    }

    fn go(&self, delta: isize) -> BoxFuture<'static, bool> {
        let entry = {
            let mut stack = self.stack.lock();
            let target = stack.current as isize + delta;
            if delta == 0 || target < 0 || target >= stack.entries.len() as isize {
                return future::ready(false).boxed();
            }
            stack.current = target as usize;
            stack.current().state.clone()
        };
        deliver(&self.listeners, HostEvent::PopState { entry })
            .map(|()| true)
            .boxed()
    }

    fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().push(message.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn subscribe(&self, listener: HostListener) -> HostSubscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        let listeners = Arc::downgrade(&self.listeners);
        HostSubscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack.lock();
        f.debug_struct("MemoryHost")
            .field("href", &stack.current().url)
            .field("position", &stack.current)
            .field("entries", &stack.entries.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
