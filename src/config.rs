//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::bus::{BusConfig, DEFAULT_HANDLER_TIMEOUT};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; without it the audit trail stays in memory
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Per-handler timeout; `None` disables it
    pub handler_timeout: Option<Duration>,

    /// Fail startup when the bus wiring is not compliant
    pub strict_wiring: bool,

    /// Expected number of registry entries
    pub expected_registry_entries: Option<usize>,

    /// Emit JSON logs
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let timeout_ms: u64 = parse_or(
            "EVENT_HANDLER_TIMEOUT_MS",
            DEFAULT_HANDLER_TIMEOUT.as_millis() as u64,
        )?;
        let handler_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let strict_wiring = parse_or("EVENT_BUS_STRICT_WIRING", true)?;

        let expected_registry_entries = match env::var("EVENT_REGISTRY_EXPECTED_ENTRIES") {
            Ok(value) => Some(
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("EVENT_REGISTRY_EXPECTED_ENTRIES"))?,
            ),
            Err(_) => None,
        };

        let json_logs = env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            handler_timeout,
            strict_wiring,
            expected_registry_entries,
            json_logs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Dispatcher settings derived from this configuration
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            handler_timeout: self.handler_timeout,
            strict_wiring: self.strict_wiring,
            expected_entries: self.expected_registry_entries,
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-wide, so one test covers them all
    #[test]
    fn test_from_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("EVENT_REGISTRY_EXPECTED_ENTRIES");
        env::set_var("EVENT_HANDLER_TIMEOUT_MS", "0");
        env::set_var("EVENT_BUS_STRICT_WIRING", "false");

        let config = Config::from_env().unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.handler_timeout, None);
        assert!(!config.bus_config().strict_wiring);

        env::set_var("EVENT_HANDLER_TIMEOUT_MS", "250");
        env::set_var("EVENT_REGISTRY_EXPECTED_ENTRIES", "13");
        let bus = Config::from_env().unwrap().bus_config();
        assert_eq!(bus.handler_timeout, Some(Duration::from_millis(250)));
        assert_eq!(bus.expected_entries, Some(13));

        env::set_var("EVENT_BUS_STRICT_WIRING", "maybe");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue("EVENT_BUS_STRICT_WIRING"))
        ));

        env::remove_var("EVENT_HANDLER_TIMEOUT_MS");
        env::remove_var("EVENT_BUS_STRICT_WIRING");
        env::remove_var("EVENT_REGISTRY_EXPECTED_ENTRIES");
    }
}
