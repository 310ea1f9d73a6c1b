//! Configuration management
//!
//! Settings load from a YAML file, then `PIPDB_*` environment variables
//! override individual values, then every section is validated.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use pipdb_common::constants::{DEFAULT_DATABASE_URI, TABLE_GEOJSON, TABLE_WHOSONFIRST};

use crate::error::{SpatialError, SpatialResult};

/// Connection pool section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum pooled connections (file databases only)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Milliseconds SQLite waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 { 8 }
fn default_acquire_timeout_secs() -> u64 { 30 }
fn default_busy_timeout_ms() -> u64 { 5_000 }

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl PoolSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        if self.acquire_timeout_secs == 0 {
            return Err("acquire_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("PIPDB_MAX_CONNECTIONS") {
            self.max_connections = v;
        }
        if let Some(v) = env_parse("PIPDB_ACQUIRE_TIMEOUT_SECS") {
            self.acquire_timeout_secs = v;
        }
        if let Some(v) = env_parse("PIPDB_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = v;
        }
    }
}

/// Point-in-polygon query section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Upper bound on concurrently running inflation tasks
    #[serde(default = "default_max_concurrent_inflations")]
    pub max_concurrent_inflations: usize,

    /// Inflated documents kept in memory; 0 disables the cache
    #[serde(default)]
    pub cache_size: usize,

    /// Seconds a cached document stays valid
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Capacity of the streaming results channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_concurrent_inflations() -> usize { 32 }
fn default_cache_ttl_secs() -> u64 { 300 }
fn default_channel_capacity() -> usize { 64 }

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_concurrent_inflations: default_max_concurrent_inflations(),
            cache_size: 0,
            cache_ttl_secs: default_cache_ttl_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl QuerySettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_inflations == 0 {
            return Err("max_concurrent_inflations must be greater than 0".to_string());
        }
        if self.max_concurrent_inflations > 1024 {
            return Err("max_concurrent_inflations should not exceed 1024".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be greater than 0".to_string());
        }
        if self.cache_size > 0 && self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0 when the cache is enabled".to_string());
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("PIPDB_MAX_CONCURRENT_INFLATIONS") {
            self.max_concurrent_inflations = v;
        }
        if let Some(v) = env_parse("PIPDB_CACHE_SIZE") {
            self.cache_size = v;
        }
        if let Some(v) = env_parse("PIPDB_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
    }
}

/// Bulk ingestion section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Table URIs documents are indexed into, in order
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Concurrent file readers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Log per-table indexing times
    #[serde(default)]
    pub timings: bool,
}

fn default_tables() -> Vec<String> {
    vec![TABLE_WHOSONFIRST.to_string(), TABLE_GEOJSON.to_string()]
}
fn default_workers() -> usize { 4 }

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            tables: default_tables(),
            workers: default_workers(),
            timings: false,
        }
    }
}

impl IngestSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.tables.is_empty() {
            return Err("at least one table must be configured".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PIPDB_TABLES") {
            let tables: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if !tables.is_empty() {
                self.tables = tables;
            }
        }
        if let Some(v) = env_parse("PIPDB_WORKERS") {
            self.workers = v;
        }
        if let Ok(val) = env::var("PIPDB_TIMINGS") {
            self.timings = val.to_lowercase() == "true" || val == "1";
        }
    }
}

/// Log output section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogSettings {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PIPDB_LOG_LEVEL") {
            self.level = val;
        }
        if let Ok(val) = env::var("PIPDB_LOG_JSON") {
            self.json = val.to_lowercase() == "true" || val == "1";
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialConfig {
    #[serde(default = "default_database_uri")]
    pub database_uri: String,

    #[serde(default)]
    pub pool: PoolSettings,

    #[serde(default)]
    pub query: QuerySettings,

    #[serde(default)]
    pub ingest: IngestSettings,

    #[serde(default)]
    pub logging: LogSettings,
}

fn default_database_uri() -> String { DEFAULT_DATABASE_URI.to_string() }

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            database_uri: default_database_uri(),
            pool: PoolSettings::default(),
            query: QuerySettings::default(),
            ingest: IngestSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl SpatialConfig {
    /// Parse YAML, apply environment overrides and validate.
    pub fn from_yaml_str(text: &str) -> SpatialResult<Self> {
        let mut config: Self = serde_yaml::from_str(text)
            .map_err(|e| SpatialError::Config(format!("invalid configuration: {}", e)))?;
        config.apply_env_overrides();
        config.validate().map_err(SpatialError::Config)?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn load(path: &Path) -> SpatialResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> SpatialResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate().map_err(SpatialError::Config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_uri.trim().is_empty() {
            return Err("database_uri cannot be empty".to_string());
        }
        self.pool.validate()?;
        self.query.validate()?;
        self.ingest.validate()?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PIPDB_DATABASE_URI") {
            self.database_uri = val;
        }
        self.pool.apply_env_overrides();
        self.query.apply_env_overrides();
        self.ingest.apply_env_overrides();
        self.logging.apply_env_overrides();
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SpatialConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.max_concurrent_inflations, 32);
        assert_eq!(config.database_uri, "sqlite://?dsn=:memory:");
        assert_eq!(config.ingest.tables, vec!["whosonfirst", "geojson"]);
    }

    #[test]
    fn test_yaml_partial_sections() {
        let config: SpatialConfig = serde_yaml::from_str(
            "database_uri: sqlite://?dsn=/tmp/pip.db\nquery:\n  cache_size: 100\n",
        )
        .unwrap();
        assert_eq!(config.database_uri, "sqlite://?dsn=/tmp/pip.db");
        assert_eq!(config.query.cache_size, 100);
        assert_eq!(config.query.max_concurrent_inflations, 32);
        assert_eq!(config.pool.max_connections, 8);
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut settings = QuerySettings::default();
        settings.max_concurrent_inflations = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_tables() {
        let mut settings = IngestSettings::default();
        settings.tables.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_cache_requires_ttl() {
        let settings = QuerySettings {
            cache_size: 10,
            cache_ttl_secs: 0,
            ..QuerySettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = SpatialConfig::from_yaml_str("query: [not, a, map]").unwrap_err();
        assert!(matches!(err, SpatialError::Config(_)));
    }
}
