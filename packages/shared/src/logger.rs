//! Logging setup utilities for the Jumble Clanker binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose logs are enabled at the default level.
const WORKSPACE_CRATES: &[&str] = &["clanker", "clanker_keepalive", "clanker_shared"];

/// Build the default filter directive used when `RUST_LOG` is not set.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "clanker")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let binary = binary_name.replace('-', "_");
    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, default_log_level))
        .collect();
    if !WORKSPACE_CRATES.contains(&binary.as_str()) {
        directives.push(format!("{}={}", binary, default_log_level));
    }
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use clanker_shared::logger::setup_logger;
///
/// setup_logger("clanker", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
