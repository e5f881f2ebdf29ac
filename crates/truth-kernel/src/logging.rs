//! Logging setup.
//!
//! Library code only emits `tracing` events. Embedders that bring their own
//! subscriber never need this module; the C ABI calls [`init`] on first use.

use tracing_subscriber::EnvFilter;

/// Filter variable read before `RUST_LOG`.
pub const LOG_ENV: &str = "TRUTH_KERNEL_LOG";

/// Default filter when neither variable is set.
pub const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `TRUTH_KERNEL_LOG`, then `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed, which is
/// not an error.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    init_with_filter(filter)
}

/// Install a fmt subscriber with an explicit filter.
pub fn init_with_filter(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
