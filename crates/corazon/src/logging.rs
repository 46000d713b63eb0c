//! Logging bootstrap for programs embedding the kernel.
//!
//! The kernel only emits `tracing` events. Hosts that already install a
//! subscriber need nothing from here; [`init`] is for tests and small
//! programs that want console output filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install a console subscriber filtered by `RUST_LOG` (default: `warn`).
///
/// Returns `false` when another subscriber was already installed.
pub fn init() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}
