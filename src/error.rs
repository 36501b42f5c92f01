//! Error handling for routing and navigation
//!
//! Provides the error type shared by the dispatch pipeline and the
//! navigation coordinator, and the outcome type of coordinator navigations.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Navigation Result Types
// ============================================================================

/// Outcome of a navigation performed through the [`Navigator`](crate::Navigator).
#[derive(Debug, Clone)]
pub enum NavigationResult<T> {
    /// A middleware resolved the route
    Success { path: String, value: T },
    /// Every middleware passed; nothing resolved the route
    NotFound { path: String },
    /// A before-exit handler refused and the user did not confirm
    Blocked { reason: String },
}

impl<T> NavigationResult<T> {
    pub(crate) fn from_routed(path: String, value: Option<T>) -> Self {
        match value {
            Some(value) => NavigationResult::Success { path, value },
            None => NavigationResult::NotFound { path },
        }
    }

    /// Check if navigation was successful
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    /// Check if no middleware resolved the route
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationResult::NotFound { .. })
    }

    /// Check if navigation was refused
    pub fn is_blocked(&self) -> bool {
        matches!(self, NavigationResult::Blocked { .. })
    }

    /// The value the resolving middleware produced, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            NavigationResult::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Consume the result, keeping only the resolved value
    pub fn into_value(self) -> Option<T> {
        match self {
            NavigationResult::Success { value, .. } => Some(value),
            _ => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while routing or navigating.
///
/// The type is `Clone` because a routing result is shared between every
/// awaiter of the same [`Routing`](crate::Routing) handle.
#[derive(Clone, thiserror::Error)]
pub enum NavigationError {
    /// The URL handed to `route` could not be parsed
    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    /// A middleware failed; the pipeline stopped at that middleware
    #[error("route handler failed: {0}")]
    Handler(Arc<dyn StdError + Send + Sync>),

    /// A lazy middleware factory failed to produce its middleware
    #[error("lazy middleware failed to load: {message}")]
    LazyLoad { message: String },

    /// A navigation operation was used while the navigator is stopped
    #[error("navigator is not listening for navigation events")]
    NotListening,

    /// The navigation host rejected an operation
    #[error("navigation host error: {message}")]
    Host { message: String },
}

impl NavigationError {
    /// Wrap an arbitrary error raised by a route handler.
    pub fn handler<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        NavigationError::Handler(Arc::new(err))
    }

    /// Build a handler failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        NavigationError::Handler(Arc::new(Message(message.into())))
    }

    /// Check if this is the listening precondition violation
    pub fn is_not_listening(&self) -> bool {
        matches!(self, NavigationError::NotListening)
    }
}

impl fmt::Debug for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Handler(err) => f.debug_tuple("Handler").field(&err.to_string()).finish(),
            other => write!(f, "{}", other),
        }
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

// ============================================================================
// Tests
// ============================================================================
