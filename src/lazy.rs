//! Lazily loaded middleware
//!
//! A [`LazyHandler`] stands in for a middleware that is expensive to build
//! (a code-split section of an app, a router filled from remote config).
//! The factory runs on the first dispatch that reaches it; concurrent
//! dispatches during the load all wait on the same load, and every later
//! dispatch goes straight to the loaded middleware. A failed load is kept
//! too: later dispatches fail with the same error without calling the
//! factory again.

use crate::context::RouteContext;
use crate::error::NavigationError;
use crate::handler::{BoxedHandler, HandlerResult, RouteHandler, RouteValue};
use crate::middleware::Middleware;
use crate::pipeline::Next;
use crate::{debug_log, warn_log};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;

type Factory<T> = Box<
    dyn FnOnce(RouteContext<T>) -> BoxFuture<'static, Result<Middleware<T>, NavigationError>>
        + Send,
>;

type Load<T> = Shared<BoxFuture<'static, Result<BoxedHandler<T>, NavigationError>>>;

struct LazyState<T: RouteValue> {
    factory: Option<Factory<T>>,
    load: Option<Load<T>>,
}

/// Handler that produces its middleware on first use
pub struct LazyHandler<T: RouteValue> {
    state: Mutex<LazyState<T>>,
}

impl<T: RouteValue> LazyHandler<T> {
    pub(crate) fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(RouteContext<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Middleware<T>, NavigationError>> + Send + 'static,
    {
        let factory: Factory<T> = Box::new(move |ctx| factory(ctx).boxed());
        Self {
            state: Mutex::new(LazyState {
                factory: Some(factory),
                load: None,
            }),
        }
    }

    /// Whether the factory has been called
    pub fn is_started(&self) -> bool {
        self.state.lock().load.is_some()
    }

    /// Whether the load finished, successfully or not
    pub fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .load
            .as_ref()
            .is_some_and(|load| load.peek().is_some())
    }

    fn load(&self, ctx: &RouteContext<T>) -> Load<T> {
        let mut state = self.state.lock();
        if let Some(load) = &state.load {
            return load.clone();
        }

        let load: Load<T> = match state.factory.take() {
            Some(factory) => {
                debug_log!("loading lazy middleware for {}", ctx.path);
                factory(ctx.clone())
                    .map(|loaded| {
                        loaded.map(Middleware::into_handler).map_err(|err| {
                            warn_log!("lazy middleware failed: {}", err);
                            err
                        })
                    })
                    .boxed()
                    .shared()
            }
            None => future::ready(Err(NavigationError::LazyLoad {
                message: "factory already consumed".to_string(),
            }))
            .boxed()
            .shared(),
        };
        state.load = Some(load.clone());
        load
    }
}

impl<T: RouteValue> RouteHandler<T> for LazyHandler<T> {
    type Future = BoxFuture<'static, HandlerResult<T>>;

    fn call(&self, ctx: RouteContext<T>, next: Next<T>) -> Self::Future {
        let load = self.load(&ctx);
        Box::pin(async move {
            let handler = load.await?;
            handler.call(ctx, next).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, Flow};
    use crate::router::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let app: Router<&'static str> = Router::new().lazy("/lazy", move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Ok(Middleware::handler(handler_fn(|_, _| async {
                    Ok(Flow::Resolve("loaded"))
                })))
            }
        });

        for _ in 0..3 {
            let value = pollster::block_on(app.route("/lazy", None)).unwrap();
            assert_eq!(value, Some("loaded"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_is_a_mount_point() {
        let app: Router<String> = Router::new().lazy("/docs", |_ctx| async {
            let docs = Router::new().handle("/:page", |ctx, _| {
                let page = ctx.params.get("page").unwrap_or_default().to_string();
                async move { Ok(Flow::Resolve(page)) }
            });
            Ok(Middleware::router(docs))
        });

        let value = pollster::block_on(app.route("/docs/intro", None)).unwrap();
        assert_eq!(value.as_deref(), Some("intro"));
    }

    #[test]
    fn test_failed_load_is_remembered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let app: Router<()> = Router::new().lazy("/broken", move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Err(NavigationError::LazyLoad {
                    message: "chunk missing".to_string(),
                })
            }
        });

        for _ in 0..2 {
            let err = pollster::block_on(app.route("/broken", None)).unwrap_err();
            assert!(matches!(err, NavigationError::LazyLoad { .. }));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_started_until_dispatched() {
        let lazy: LazyHandler<()> = LazyHandler::new(|_ctx| async {
            Ok(Middleware::router(Router::new()))
        });
        assert!(!lazy.is_started());
        assert!(!lazy.is_loaded());
    }
}
