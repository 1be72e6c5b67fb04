//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::domain::clock::DEFAULT_TIMEZONE;
use crate::jobs::JobSchedulerConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL for exhibitions, sections and rooms
    pub database_url: String,

    /// Database connection URL for the comment store
    pub comment_database_url: String,

    /// Maximum database connections in each pool
    pub database_max_connections: u32,

    /// Connect/acquire timeout and per-operation deadline
    pub database_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Interval of the visibility sweep
    pub sweep_interval: Duration,

    /// Zone in which "now" is rendered for date comparisons
    pub sweep_timezone: Tz,

    /// Interval of orphan and dangling-reference reconciliation
    pub reconcile_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let comment_database_url = lookup("COMMENT_DATABASE_URL")
            .ok_or(ConfigError::MissingEnv("COMMENT_DATABASE_URL"))?;

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let database_timeout = seconds(&lookup, "DATABASE_TIMEOUT_SECS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let sweep_interval = seconds(&lookup, "SWEEP_INTERVAL_SECS", 3600)?;

        let sweep_timezone = match lookup("SWEEP_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidValue("SWEEP_TIMEZONE"))?,
            None => DEFAULT_TIMEZONE,
        };

        let reconcile_interval = seconds(&lookup, "RECONCILE_INTERVAL_SECS", 21600)?;

        Ok(Self {
            database_url,
            comment_database_url,
            database_max_connections,
            database_timeout,
            host,
            port,
            environment,
            sweep_interval,
            sweep_timezone,
            reconcile_interval,
        })
    }

    pub fn scheduler(&self) -> JobSchedulerConfig {
        JobSchedulerConfig {
            sweep_interval: self.sweep_interval,
            reconcile_interval: self.reconcile_interval,
        }
    }
}

/// Positive whole seconds, with a default
fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue(key))?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidValue(key));
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/exhibitions"),
        ("COMMENT_DATABASE_URL", "postgres://localhost/comments"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.database_timeout, Duration::from_secs(10));
        assert_eq!(config.port, 3000);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.reconcile_interval, Duration::from_secs(21600));
        assert_eq!(config.sweep_timezone, chrono_tz::Asia::Bangkok);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_missing_comment_database() {
        let err = load(&REQUIRED[..1]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("COMMENT_DATABASE_URL")));
    }

    #[test]
    fn test_timezone_parsing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SWEEP_TIMEZONE", "Europe/Paris"));
        assert_eq!(load(&pairs).unwrap().sweep_timezone, chrono_tz::Europe::Paris);

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SWEEP_TIMEZONE", "Mars/Olympus"));
        assert!(matches!(
            load(&pairs).unwrap_err(),
            ConfigError::InvalidValue("SWEEP_TIMEZONE")
        ));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SWEEP_INTERVAL_SECS", "0"));
        assert!(matches!(
            load(&pairs).unwrap_err(),
            ConfigError::InvalidValue("SWEEP_INTERVAL_SECS")
        ));
    }
}
