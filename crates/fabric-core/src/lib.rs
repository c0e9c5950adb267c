#![forbid(unsafe_code)]

//! Core: logging facade and reconciliation configuration shared by the
//! shadow tree kernel and the commit runtime.

pub mod config;
pub mod logging;

pub use config::ReconcileConfig;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, warn};
