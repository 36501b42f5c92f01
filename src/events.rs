//! Synchronous event emitter
//!
//! Backs the router's `route`/unmatched notifications and the before-exit
//! handler registry. Listeners are called in subscription order and their
//! return values are collected.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`Emitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E, R> = Arc<dyn Fn(&mut E) -> R + Send + Sync>;

/// A list of listeners for events of type `E`, each answering with an `R`.
pub struct Emitter<E, R = ()> {
    listeners: Mutex<Vec<(SubscriptionId, Listener<E, R>)>>,
    next_id: AtomicU64,
}

impl<E, R> Emitter<E, R> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&mut E) -> R + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener with `event` and collect the answers.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe while the event is being delivered.
    pub fn emit(&self, event: &mut E) -> Vec<R> {
        let snapshot: Vec<Listener<E, R>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        let mut answers = Vec::with_capacity(snapshot.len());
        for listener in &snapshot {
            answers.push(listener(&mut *event));
        }
        answers
    }
}

impl<E, R> Default for Emitter<E, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, R> fmt::Debug for Emitter<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}
