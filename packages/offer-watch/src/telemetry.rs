//! Tracing subscriber setup for binaries embedding the watcher.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info,offer_watch=debug";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directives`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(default_directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
