//! Before-exit confirmation
//!
//! While a navigator is listening, middleware can register before-exit
//! handlers through [`RouteContext::before_exit`](crate::RouteContext::before_exit).
//! Before leaving the current route every handler is called with a shared
//! [`BeforeExitEvent`]. A handler refuses the exit by:
//!
//! - calling [`BeforeExitEvent::prevent_default`], or
//! - returning a non-empty message.
//!
//! If any handler refused, the user is asked to confirm with the event's
//! message (or the configured default). Handlers are cleared once the exit
//! goes ahead.
//!
//! # Example
//!
//! ```
//! use middle_router::BeforeExitEvent;
//!
//! let unsaved = |event: &mut BeforeExitEvent| {
//!     event.prevent_default();
//!     Some("You have unsaved changes".to_string())
//! };
//!
//! let mut event = BeforeExitEvent::new("/elsewhere");
//! assert_eq!(unsaved(&mut event).as_deref(), Some("You have unsaved changes"));
//! assert!(event.default_prevented());
//! ```

/// Message shown when a handler refused without giving one
pub const DEFAULT_EXIT_MESSAGE: &str = "Are you sure you want to leave this page?";

/// Event passed to every before-exit handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeExitEvent {
    to: String,
    message: Option<String>,
    default_prevented: bool,
}

impl BeforeExitEvent {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            message: None,
            default_prevented: false,
        }
    }

    /// Path (or href) being navigated to
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Refuse the exit
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Set the confirmation message; does not refuse on its own
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// What the before-exit handlers decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCheck {
    /// No handler objected
    Allow,
    /// At least one handler refused; ask the user with this message
    Confirm { message: String },
}

impl ExitCheck {
    /// Fold the handlers' answers into a decision.
    ///
    /// The last non-empty returned message becomes the event message, so a
    /// later handler's wording wins.
    pub(crate) fn evaluate(
        mut event: BeforeExitEvent,
        answers: Vec<Option<String>>,
        default_message: &str,
    ) -> Self {
        let mut refused = event.default_prevented;
        for answer in answers.into_iter().flatten() {
            if !answer.is_empty() {
                refused = true;
                event.message = Some(answer);
            }
        }

        if !refused {
            return ExitCheck::Allow;
        }

        let message = event
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_message.to_string());
        ExitCheck::Confirm { message }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, ExitCheck::Allow)
    }
}
