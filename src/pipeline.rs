//! Dispatch pipeline
//!
//! Walks an ordered chain of wrapped middleware for one context. Each layer
//! either skips (its pattern does not match) or runs its handler with a
//! [`Next`] continuation over the rest of the chain:
//!
//! - `Flow::Resolve(v)` ends the walk with `v`;
//! - `Flow::Continue` without calling `next` moves on to the following layer;
//! - `Flow::Continue` after calling `next` settles with whatever the
//!   downstream walk produced;
//! - an error stops the walk and is returned as is.
//!
//! When the chain is exhausted the walk falls through to its tail: the
//! parent chain for a mounted router, or the unmatched diagnostic at the top.

use crate::context::RouteContext;
use crate::error::NavigationError;
use crate::handler::{Flow, RouteValue};
use crate::middleware::Layer;
use crate::trace_log;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Outcome of a full dispatch: `None` when nothing resolved
pub type RouteOutcome<T> = Result<Option<T>, NavigationError>;

pub(crate) type Chain<T> = Arc<Vec<Layer<T>>>;

/// What a layer's handler did with its continuation
enum NextRecord<T> {
    Unused,
    Invoked,
    Settled(Option<T>),
}

/// Where a walk goes once its chain is exhausted
pub(crate) enum Tail<T: RouteValue> {
    /// Top-level: report that nothing matched
    Unmatched,
    /// Nested: continue in the enclosing chain
    Outer(Box<Next<T>>),
}

impl<T: RouteValue> Tail<T> {
    fn duplicate(&self) -> Self {
        match self {
            Tail::Unmatched => Tail::Unmatched,
            Tail::Outer(next) => Tail::Outer(Box::new(next.duplicate())),
        }
    }

    async fn finish(self, ctx: &RouteContext<T>) -> RouteOutcome<T> {
        match self {
            Tail::Outer(next) => next.run().await,
            Tail::Unmatched => {
                ctx.router.report_unmatched(&ctx.location.pathname);
                Ok(None)
            }
        }
    }
}

/// Continuation handed to every handler.
///
/// Running it dispatches the remaining middleware (and, for a mounted
/// router, the rest of the enclosing chain) and yields their outcome.
/// It can be run at most once; `run` consumes it.
pub struct Next<T: RouteValue> {
    chain: Chain<T>,
    index: usize,
    ctx: RouteContext<T>,
    tail: Tail<T>,
    record: Arc<Mutex<NextRecord<T>>>,
}

impl<T: RouteValue> Next<T> {
    /// Dispatch everything downstream and return its outcome.
    pub async fn run(self) -> RouteOutcome<T> {
        let Next {
            chain,
            index,
            ctx,
            tail,
            record,
        } = self;

        *record.lock() = NextRecord::Invoked;
        let outcome = run(chain, index, ctx, tail).await;
        if let Ok(value) = &outcome {
            *record.lock() = NextRecord::Settled(value.clone());
        }
        outcome
    }

    /// A continuation with nothing downstream
    #[cfg(test)]
    pub(crate) fn detached(ctx: RouteContext<T>) -> Self {
        Self {
            chain: Arc::new(Vec::new()),
            index: 0,
            ctx,
            tail: Tail::Unmatched,
            record: Arc::new(Mutex::new(NextRecord::Unused)),
        }
    }

    fn duplicate(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            index: self.index,
            ctx: self.ctx.clone(),
            tail: self.tail.duplicate(),
            record: Arc::clone(&self.record),
        }
    }
}

impl<T: RouteValue> fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.chain.len().saturating_sub(self.index))
            .field("path", &self.ctx.path)
            .finish()
    }
}

/// Walk `chain` from `start` for `ctx`, falling through to `tail`.
pub(crate) fn run<T: RouteValue>(
    chain: Chain<T>,
    start: usize,
    ctx: RouteContext<T>,
    tail: Tail<T>,
) -> BoxFuture<'static, RouteOutcome<T>> {
    Box::pin(async move {
        let mut index = start;
        while let Some(layer) = chain.get(index) {
            index += 1;

            let record = Arc::new(Mutex::new(NextRecord::Unused));
            let next = Next {
                chain: Arc::clone(&chain),
                index,
                ctx: ctx.clone(),
                tail: tail.duplicate(),
                record: Arc::clone(&record),
            };

            let Some(pending) = layer.dispatch(&ctx, next) else {
                continue;
            };
            trace_log!("layer {} handling {}", index - 1, ctx.path);

            match pending.await? {
                Flow::Resolve(value) => return Ok(Some(value)),
                Flow::Continue => {
                    let used = std::mem::replace(&mut *record.lock(), NextRecord::Unused);
                    match used {
                        NextRecord::Unused => continue,
                        NextRecord::Invoked => return Ok(None),
                        NextRecord::Settled(outcome) => return Ok(outcome),
                    }
                }
            }
        }

        tail.finish(&ctx).await
    })
}
