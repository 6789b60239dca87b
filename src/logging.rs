use std::io;
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Tracing target for per-request access logs.
pub const TARGET_HTTP: &str = "http";

/// Build the filter used when `RUST_LOG` is not set.
///
/// sqlx logs every statement at INFO, which drowns out request logs, so it
/// is capped at WARN.
pub fn default_filter(level: Level) -> EnvFilter {
    let level = level.to_string().to_lowercase();
    EnvFilter::new(format!("{},sqlx=warn", level))
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the configured level. Dev mode switches to
/// the multi-line pretty formatter with source locations.
pub fn configure_logging(level: Level, dev_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let registry = tracing_subscriber::registry().with(filter);

    if dev_mode {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(io::stdout),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(io::stdout))
            .init();
    }
}
