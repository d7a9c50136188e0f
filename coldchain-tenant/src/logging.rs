//! Logging infrastructure for the routing core.
//!
//! Structured logging controlled by the `COLDCHAIN_DEBUG` environment
//! variable.
//!
//! # Environment Variables
//!
//! - `COLDCHAIN_DEBUG=true` - Enable debug logging
//! - `COLDCHAIN_DEBUG=1` - Enable debug logging
//! - `COLDCHAIN_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `COLDCHAIN_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use coldchain_tenant::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Inside the crate, the standard tracing macros are used:
//!
//! ```rust,ignore
//! use tracing::{debug, info, warn, error};
//!
//! debug!(tenant_id = %tenant_id, "tenant config resolved");
//! warn!(routing_key = %key, "routing key has no pool, using default");
//! error!(error = %e, "schema switch failed");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `COLDCHAIN_DEBUG`.
///
/// Returns `true` if `COLDCHAIN_DEBUG` is set to "true", "1", or "yes"
/// (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("COLDCHAIN_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `COLDCHAIN_LOG_LEVEL`.
///
/// Defaults to "debug" if `COLDCHAIN_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    if let Ok(level) = env::var("COLDCHAIN_LOG_LEVEL") {
        match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => {
                if is_debug_enabled() {
                    "debug"
                } else {
                    "warn"
                }
            }
        }
    } else if is_debug_enabled() {
        "debug"
    } else {
        "warn"
    }
}

/// Get the configured log format from `COLDCHAIN_LOG_FORMAT`.
///
/// Defaults to "json" for structured logging.
pub fn get_log_format() -> &'static str {
    env::var("COLDCHAIN_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the logging system.
///
/// This should be called once at application startup. Subsequent calls are
/// no-ops.
///
/// Logging is controlled by:
/// - `COLDCHAIN_DEBUG=true` - Enable debug-level logging
/// - `COLDCHAIN_LOG_LEVEL` - Override the log level (trace, debug, info, warn, error)
/// - `COLDCHAIN_LOG_FORMAT` - Output format (pretty, json, compact)
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("COLDCHAIN_LOG_LEVEL").is_err() {
            // No logging requested, skip initialization
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "coldchain={},coldchain_tenant={},coldchain_postgres={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "coldchain logging initialized"
            );
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            // Without the tracing-subscriber feature the host application
            // installs its own subscriber.
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: This should only be called at program startup before threads
    // are spawned. The user is responsible for calling this safely.
    unsafe {
        env::set_var("COLDCHAIN_LOG_LEVEL", level);
    }
    init();
}

/// Initialize logging for debugging (convenience function).
///
/// Equivalent to setting `COLDCHAIN_DEBUG=true` and calling `init()`.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_debug() {
    // SAFETY: This should only be called at program startup before threads
    // are spawned.
    unsafe {
        env::set_var("COLDCHAIN_DEBUG", "true");
    }
    init();
}

/// Macro for conditional debug logging.
///
/// Only logs if `COLDCHAIN_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! coldchain_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional trace logging.
#[macro_export]
macro_rules! coldchain_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
