//! Log subscriber setup for hosts that have none.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `PKGBIND_LOG`, then `RUST_LOG`,
/// then `info`.
///
/// Returns `false` when a global subscriber was already installed; it is
/// left in place.
pub fn init() -> bool {
    let filter = std::env::var("PKGBIND_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
