#![forbid(unsafe_code)]

//! Logging and tracing support.
//!
//! With the `tracing` feature enabled, the `tracing` macros used by the
//! commit runtime are re-exported here and at the crate root. Without it,
//! no-op macros with the same names are exported instead, so the runtime can
//! log unconditionally:
//!
//! ```
//! let surface = 7;
//! let span = fabric_core::debug_span!("commit", surface);
//! let _guard = span.enter();
//! fabric_core::trace!(surface, "commit started");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, trace, warn};

// Only the macros the commit runtime calls have fallbacks.
#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Discards a debug event when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Stands in for a debug span when tracing is disabled.
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// Discards a trace event when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Discards a warning when tracing is disabled.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}

/// Returned by `debug_span!` without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn enter(&self) -> NoopGuard {
        NoopGuard
    }
}

/// Guard returned by [`NoopSpan::enter`].
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopGuard;
