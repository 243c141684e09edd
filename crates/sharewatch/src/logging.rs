//! Logging setup.
//!
//! Every crate in the workspace logs through `tracing` with event names of
//! the form `sharewatch::<event>`. Failure reports written through a
//! [`TracingSink`](crate::TracingSink) arrive at `ERROR`, their one-line
//! summaries at `WARN`, and call capture at `TRACE`. `RUST_LOG` overrides the
//! default filter when set.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Install a compact terminal subscriber as the global default.
///
/// `verbose` lowers the default filter from `info` to `trace`.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<(), TryInitError> {
    let default = if verbose { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .compact(),
        )
        .try_init()
}

/// Logging for tests: output goes through the test harness capture, and
/// repeated calls are harmless.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}
