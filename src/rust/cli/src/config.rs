//! CLI configuration module
//!
//! Resolves the library configuration from (lowest to highest precedence)
//! built-in defaults, an optional YAML file, `PIPDB_*` environment variables
//! and command-line flags.

use std::path::Path;

use anyhow::{Context as _, Result};

use pipdb_core::SpatialConfig;

/// Output format for CLI responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
    /// Plain text (minimal formatting)
    Plain,
}

impl OutputFormat {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            "plain" | "text" => Some(Self::Plain),
            _ => None,
        }
    }
}

/// Everything a command needs to run
#[derive(Debug, Clone)]
pub struct Context {
    pub config: SpatialConfig,
    pub format: OutputFormat,
}

impl Context {
    /// Build the effective configuration.
    pub fn resolve(config_path: Option<&Path>, database_uri: Option<String>, format: &str) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => SpatialConfig::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => SpatialConfig::from_env().context("invalid environment configuration")?,
        };

        if let Some(uri) = database_uri {
            config.database_uri = uri;
        }

        let format = OutputFormat::from_str(format)
            .with_context(|| format!("unknown output format '{}' (expected table, json or plain)", format))?;

        Ok(Self { config, format })
    }
}
