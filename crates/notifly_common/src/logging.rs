//! Logging utilities for the Notifly crates.
//!
//! Every crate logs through `tracing`; binaries call [`init`] or
//! [`init_with_level`] once at startup to install the subscriber.

use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use notifly_common::logging;
///
/// logging::init();
/// // a second call is a no-op
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level for the
/// `notifly` targets. `RUST_LOG` directives are honoured on top of it.
pub fn init_with_level(level: Level) {
    let mut filter = EnvFilter::from_default_env();
    for target in [
        "notifly",
        "notifly_realtime",
        "notifly_push",
        "notifly_agent",
        "notifly_inbox",
        "notifly_session",
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    // try_init: a global subscriber may already be installed (tests, embedders)
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}
