//! Installs the tracing subscriber for the messenger binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// init_logging installs a fmt subscriber at `level`. RUST_LOG, when set, wins over `level`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

/* ------------------------------------------------------------------------- */

// TESTS
