//! Structured logging for the provider process.
//!
//! Logs go to stderr; stdout belongs to the host protocol. `RUST_LOG`
//! controls filtering, e.g. `RUST_LOG=snowflake_provider=debug` shows every
//! tagged statement as it is sent.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Installs the global subscriber at `info`, unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber is already set. Use [`try_init_logging`] where
/// that can happen, e.g. in tests.
pub fn init_logging() {
    tracing_subscriber::registry().with(filter("info")).with(layer()).init();
}

/// Like [`init_logging`], with a different default level.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(layer())
        .init();
}

/// Returns false when a subscriber was already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(layer())
        .try_init()
        .is_ok()
}
