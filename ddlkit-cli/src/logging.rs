//! Logging setup for the CLI.
//!
//! The engine only emits `tracing` events; this module decides whether and
//! how they are printed.
//!
//! # Environment Variables
//!
//! - `DDLKIT_DEBUG=true|1|yes` - Enable debug logging
//! - `DDLKIT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `DDLKIT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! Logs go to stderr so they never mix with SQL or JSON on stdout.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `DDLKIT_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("DDLKIT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Level from `DDLKIT_LOG_LEVEL`; `debug` when `DDLKIT_DEBUG` is on,
/// otherwise `warn`.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("DDLKIT_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Format from `DDLKIT_LOG_FORMAT`, defaulting to `json`.
pub fn get_log_format() -> &'static str {
    env::var("DDLKIT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize logging. Subsequent calls are no-ops, and nothing is installed
/// unless logging was asked for.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("DDLKIT_LOG_LEVEL").is_err() {
            return;
        }

        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let level = get_log_level();
        let filter = EnvFilter::try_new(format!(
            "ddlkit={},ddlkit_migrate={},ddlkit_cli={}",
            level, level, level
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        match get_log_format() {
            "json" => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact().with_writer(std::io::stderr))
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
        }

        tracing::info!(level, format = get_log_format(), "ddlkit logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        if env::var("DDLKIT_DEBUG").is_err() && env::var("DDLKIT_LOG_LEVEL").is_err() {
            assert_eq!(get_log_level(), "warn");
        }
        if env::var("DDLKIT_LOG_FORMAT").is_err() {
            assert_eq!(get_log_format(), "json");
        }
    }
}
