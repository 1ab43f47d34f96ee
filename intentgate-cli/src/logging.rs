//! Logging setup for the intentgate binary.
//!
//! Logs go to stderr; stdout is reserved for protocol output.

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "INTENTGATE_LOG";

/// Initialize tracing on stderr.
///
/// Reads [`LOG_ENV`] for the filter (default: "info"). Calling this twice is
/// harmless; the second call does nothing.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
