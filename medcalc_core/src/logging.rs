//! Logging infrastructure for medcalc.
//!
//! The `medcalc` binary prints results, calculator forms and the session
//! prompt on stdout, and test harnesses drive the session through stdin and
//! match on that output. Every log line therefore goes to stderr. Store
//! commits log field names only, never patient values.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging for the `medcalc` binary
///
/// Quiet (WARN) unless RUST_LOG asks for more; `RUST_LOG=debug` shows store
/// commits, mounts and failed session commands.
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a specific default level
///
/// RUST_LOG, when set, takes precedence over `default_level`.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Route debug logs through the test harness writer
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
