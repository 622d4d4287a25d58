// --- Файл: src/logging.rs ---

//! Tracing setup for binaries and examples.

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Panics if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
