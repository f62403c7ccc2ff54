//! Logging Setup
//!
//! The library itself only emits `tracing` events. Binaries, benches and
//! tests that want to see them call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"pathtree_core=debug"`) when it is unset.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// Returns whether this call installed it.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("pathtree_core=debug");
        assert!(!init_tracing("pathtree_core=debug"));
    }
}
