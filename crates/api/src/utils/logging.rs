//! Structured logging for the HTTP shell

use std::env;
use std::time::Duration;

use calmate_domain::CalmateError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,calmate=debug";

/// Set to `json` for one JSON object per log line.
pub const LOG_FORMAT_ENV: &str = "CALMATE_LOG_FORMAT";

/// Install the global tracing subscriber.
///
/// Calling it twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing() {
    let filter = env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER), EnvFilter::new)
        .add_directive("hyper=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()))
        .add_directive("reqwest=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()));

    let registry = tracing_subscriber::registry().with(filter);
    let json = env::var(LOG_FORMAT_ENV).is_ok_and(|value| value.eq_ignore_ascii_case("json"));

    let result = if json {
        registry.with(fmt::layer().with_target(true).json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` is a logical identifier such as `"calendar::create_event"`;
/// callers must not forward tokens or request bodies through it.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    success: bool,
    error_type: Option<&str>,
) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if success {
        info!(command, elapsed_ms, success, "command_execution_success");
    } else {
        warn!(command, elapsed_ms, success, error_type, "command_execution_failure");
    }
}

/// Stable label for an error, for logs.
#[inline]
pub fn error_label(error: &CalmateError) -> &'static str {
    error.kind()
}
