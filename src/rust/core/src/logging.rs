//! Structured logging setup
//!
//! `RUST_LOG` takes precedence over the configured level. Output goes to
//! stderr so command output on stdout stays machine-readable.

use std::env;

use tracing::{debug, Level};
use tracing_subscriber::{fmt::time::ChronoUtc, EnvFilter};

use crate::config::LogSettings;
use crate::error::SpatialResult;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: Level,
    /// Enable JSON structured output
    pub json_format: bool,
    /// Force disable ANSI colors (NO_COLOR is honored when None)
    pub force_disable_ansi: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            force_disable_ansi: None,
        }
    }
}

impl LoggingConfig {
    /// Build from the `logging` configuration section; unknown levels fall back to info.
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            level: parse_level(&settings.level).unwrap_or(Level::INFO),
            json_format: settings.json,
            force_disable_ansi: None,
        }
    }

    /// Verbosity from repeated `-v` flags: 0 warn, 1 info, 2 debug, 3+ trace.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Parse a level name, case-insensitively.
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse().ok()
}

/// Install the global subscriber. A no-op when one is already installed.
pub fn initialize_logging(config: LoggingConfig) -> SpatialResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let disable_ansi = config
        .force_disable_ansi
        .unwrap_or_else(|| env::var("NO_COLOR").is_ok());

    let result = if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(false)
            .with_ansi(!disable_ansi)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if let Err(e) = result {
        debug!("Global subscriber already installed: {}", e);
    }
    Ok(())
}
