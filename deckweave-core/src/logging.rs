//! Tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Filter resolution: `DECKWEAVE_LOG` env var, falling back to `default`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_env("DECKWEAVE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
