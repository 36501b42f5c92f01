//! Logging facade
//!
//! The router logs through either the `log` crate (default) or `tracing`,
//! picked with the Cargo feature of the same name. The two backends are
//! mutually exclusive; with neither enabled every macro compiles to nothing.
//!
//! ```ignore
//! use middle_router::{debug_log, error_log};
//!
//! debug_log!("routing {}", path);
//! error_log!("no route matches {}", path);
//! ```

#[cfg(all(feature = "log", feature = "tracing"))]
compile_error!("features `log` and `tracing` are mutually exclusive");

/// Forwards a record at the given level to whichever backend is enabled.
#[doc(hidden)]
#[macro_export]
macro_rules! __router_log {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
        #[cfg(not(any(feature = "log", feature = "tracing")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Trace-level record: registration and matching internals.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => { $crate::__router_log!(trace, $($arg)*) };
}

/// Debug-level record: routing calls, listener changes, lazy loads.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => { $crate::__router_log!(debug, $($arg)*) };
}

/// Info-level record: refused or reverted navigations.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => { $crate::__router_log!(info, $($arg)*) };
}

/// Warn-level record: recoverable oddities such as undecodable paths.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => { $crate::__router_log!(warn, $($arg)*) };
}

/// Error-level record: the unmatched-route diagnostic and handler failures.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => { $crate::__router_log!(error, $($arg)*) };
}
