//! Tracing subscriber setup.
//!
//! The crate logs structured events through `tracing`; applications that do
//! not install their own subscriber can call [`init`] once at startup.
//! Filtering follows `RUST_LOG` (e.g. `RUST_LOG=webiface=debug`).

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber with env-filter support.
///
/// Safe to call more than once; later calls are no-ops if a global
/// subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
