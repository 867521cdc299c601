//! Logging initialisation
//!
//! Installs the global `tracing` subscriber once at startup.

mod logging;

pub use logging::{TelemetryError, build_filter, init_logging};
