//! Logging setup for the poolwire binary
//!
//! Library code only emits `tracing` events; the binary decides where they
//! go. Events are written to stderr so stdout stays parseable in JSON mode.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "POOLWIRE_LOG";

fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("poolwire=debug");
    }
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the stderr subscriber once per process
pub fn init(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let result = tracing_subscriber::registry()
            .with(filter(verbose))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbose)
                    .with_ansi(false),
            )
            .try_init();

        // Someone else (a test harness, an embedding app) already owns it
        if result.is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
