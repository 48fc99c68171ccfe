//! Shared helpers for unit tests.

use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber for the current process.
///
/// `RUST_LOG` overrides the default `tabshell_autofill=debug` filter. Later
/// calls are no-ops.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tabshell_autofill=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}
