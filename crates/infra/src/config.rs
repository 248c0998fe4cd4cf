//! Storage configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Read `var` from the environment, falling back to `default` when unset or
/// empty. A value that is set but does not parse is an error, never a silent
/// fallback.
pub fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        _ => Ok(default),
    }
}

/// SQLite pool and locking knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file; created if missing.
    pub db_path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for the SQLite write lock before the operation
    /// fails as contended.
    pub busy_timeout: Duration,
    /// How long an operation waits for a pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("depot.sqlite3"),
            max_connections: 8,
            busy_timeout: Duration::from_millis(5000),
            acquire_timeout: Duration::from_millis(5000),
        }
    }
}

impl StoreConfig {
    /// Defaults with a specific database file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::default()
        }
    }

    /// Load from `DEPOT_DB_PATH`, `DEPOT_MAX_CONNECTIONS`,
    /// `DEPOT_BUSY_TIMEOUT_MS` and `DEPOT_ACQUIRE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_connections = env_or("DEPOT_MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DEPOT_MAX_CONNECTIONS",
                value: "0".into(),
            });
        }
        Ok(Self {
            db_path: env_or("DEPOT_DB_PATH", defaults.db_path)?,
            max_connections,
            busy_timeout: Duration::from_millis(env_or("DEPOT_BUSY_TIMEOUT_MS", 5000u64)?),
            acquire_timeout: Duration::from_millis(env_or("DEPOT_ACQUIRE_TIMEOUT_MS", 5000u64)?),
        })
    }
}
