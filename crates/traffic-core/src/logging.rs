#![forbid(unsafe_code)]

//! Production log output.
//!
//! The runtime emits `tracing` events; this module (feature `tracing-json`)
//! installs a subscriber that writes them as line-delimited JSON filtered by
//! `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "traffic_runtime=info,traffic_harness=info";

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json_subscriber() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .is_ok()
}
