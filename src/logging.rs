//! Tracing setup for hosts that don't install their own subscriber.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the level is `info`, or `debug` when `verbose`.
/// Returns `false` when a global subscriber was already set, which makes
/// repeated calls harmless.
pub fn init_tracing(verbose: bool) -> bool {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
