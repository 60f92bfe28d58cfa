//! Logging initialisation
//!
//! Installs a compact `tracing-subscriber` formatter. `RUST_LOG` takes
//! precedence over the configured level and `MOSAICMUX_DEBUG=1` forces
//! debug output.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable that forces debug logging
pub const DEBUG_ENV: &str = "MOSAICMUX_DEBUG";

/// Resolve the filter directive from the environment and configuration
pub fn filter_directive(config: &LoggingConfig) -> String {
    if let Ok(directive) = env::var("RUST_LOG") {
        if !directive.trim().is_empty() {
            return directive;
        }
    }

    let debug_forced = env::var(DEBUG_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if debug_forced {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber
///
/// Returns `Ok(false)` if a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> crate::Result<bool> {
    let directive = filter_directive(config);
    let filter = EnvFilter::try_new(&directive).map_err(|e| {
        crate::Error::ConfigValidationFailed {
            field: "logging.level".to_string(),
            reason: e.to_string(),
        }
    })?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        debug!("Logging initialised with filter '{}'", directive);
    }
    Ok(installed)
}
