//! # Middle Router
//!
//! A composable URL router built around an async middleware pipeline:
//!
//! - **Middleware Dispatch** - Ordered handlers with `next` continuations (onion style)
//! - **Path Patterns** - Named params, optional params, constraints and wildcards
//! - **Nested Routers** - Mount routers under prefixes; params accumulate downward
//! - **Lazy Middleware** - Load a section on first use, exactly once
//! - **History Coordination** - Drive a router from a navigation host (pushes, pops, link clicks)
//! - **Before-Exit Confirmation** - Let the current route refuse to be left
//! - **Hash Routing** - Route on the URL inside the hash
//!
//! # Quick Start
//!
//! ```
//! use middle_router::{Flow, Router};
//!
//! let users: Router<String> = Router::new()
//!     .handle("/:id", |ctx, _next| {
//!         let id = ctx.params.get("id").unwrap_or_default().to_string();
//!         async move { Ok(Flow::Resolve(format!("user {}", id))) }
//!     });
//!
//! let app = Router::new()
//!     .handle("/", |_ctx, _next| async { Ok(Flow::Resolve("home".to_string())) })
//!     .mount("/users", users);
//!
//! pollster::block_on(async {
//!     assert_eq!(app.route("/users/7", None).await.unwrap().as_deref(), Some("user 7"));
//!     assert_eq!(app.route("/missing", None).await.unwrap(), None);
//! });
//! ```
//!
//! # Middleware
//!
//! A handler that awaits `next.run()` wraps everything registered after it:
//!
//! ```
//! use middle_router::{Flow, Router};
//!
//! let app: Router<String> = Router::new()
//!     .handle("", |_ctx, next| async move {
//!         let page = next.run().await?;
//!         Ok(Flow::from(page.map(|body| format!("<layout>{}</layout>", body))))
//!     })
//!     .handle("/about", |_ctx, _next| async { Ok(Flow::Resolve("about".to_string())) });
//!
//! let page = pollster::block_on(app.route("/about", None)).unwrap();
//! assert_eq!(page.as_deref(), Some("<layout>about</layout>"));
//! ```
//!
//! # Navigation
//!
//! A [`Navigator`] connects a router to a [`NavigationHost`]; [`MemoryHost`]
//! is an in-memory host for tests and non-browser shells.
//!
//! ```ignore
//! let navigator = Navigator::new(router, host);
//! navigator.start().await?;
//! navigator.navigate("/profile", None)?.await?;
//! navigator.back()?.await?;
//! navigator.stop();
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU cache of path match outcomes per pattern

#![doc(html_root_url = "https://docs.rs/middle-router/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Core routing modules
pub mod handler;
pub mod lazy;
pub mod location;
pub mod matcher;
pub mod middleware;
mod nested;
pub mod pipeline;
pub mod router;

// Error handling
pub mod error;

// Navigation
pub mod events;
pub mod history;
pub mod host;
pub mod lifecycle;
pub mod memory;
pub mod navigator;

// Other modules
pub mod params;

mod context;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, MatchCache};
pub use context::{Exiting, RouteContext, RouteState};
pub use error::{NavigationError, NavigationResult};
pub use events::{Emitter, SubscriptionId};
pub use handler::{boxed, handler_fn, BoxedHandler, Flow, FnHandler, HandlerResult, RouteHandler, RouteValue};
pub use history::HistoryLedger;
pub use host::{
    EntryState, HostEvent, HostListener, HostSubscription, LinkClick, MouseButton, NavigationHost,
};
pub use lazy::LazyHandler;
pub use lifecycle::{BeforeExitEvent, ExitCheck, DEFAULT_EXIT_MESSAGE};
pub use location::{Location, ParseOptions};
pub use matcher::{PathMatch, PathMatcher};
pub use memory::MemoryHost;
pub use middleware::Middleware;
pub use navigator::{HistoryFuture, NavigationFuture, Navigator, NavigatorOptions};
pub use params::{QueryParams, RouteParams};
pub use pipeline::{Next, RouteOutcome};
pub use router::{Router, RouterEvent, RouterOptions, Routing};
