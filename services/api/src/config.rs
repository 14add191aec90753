//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use site_audit_core::fetch::{
    DEFAULT_MAX_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use site_audit_core::fixes::{DEFAULT_BATCH_SIZE, DEFAULT_TIMEOUT_SECS as DEFAULT_FIX_TIMEOUT_SECS};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the outbound page fetcher.
#[derive(Clone, Debug)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_bytes: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_bytes: DEFAULT_MAX_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Postgres is used when set; runs are kept in memory otherwise.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub fix_model: String,
    pub fix_timeout: Duration,
    pub fix_batch_size: usize,
    pub fetch: FetchSettings,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Generation Service Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let openai_base_url = lookup("OPENAI_BASE_URL");
        let fix_model = lookup("FIX_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let fix_timeout =
            Duration::from_secs(parse_or(&lookup, "FIX_TIMEOUT_SECS", Some(DEFAULT_FIX_TIMEOUT_SECS))?);
        let fix_batch_size: usize = parse_or(&lookup, "FIX_BATCH_SIZE", Some(DEFAULT_BATCH_SIZE))?;
        if fix_batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "FIX_BATCH_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        // --- Fetcher Settings ---
        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                Some(defaults.timeout.as_secs()),
            )?),
            max_bytes: parse_or(&lookup, "FETCH_MAX_BYTES", Some(defaults.max_bytes))?,
            max_redirects: parse_or(&lookup, "FETCH_MAX_REDIRECTS", Some(defaults.max_redirects))?,
            user_agent: lookup("FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
        };

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_base_url,
            fix_model,
            fix_timeout,
            fix_batch_size,
            fetch,
            cors_origin,
        })
    }
}

/// Parses `key` if present, falling back to `default`; a missing key with no
/// default is a `MissingVar`.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.fix_model, "gpt-4o-mini");
        assert_eq!(config.fix_timeout, Duration::from_secs(60));
        assert_eq!(config.fix_batch_size, 5);
        assert_eq!(config.fetch.timeout, Duration::from_secs(15));
        assert_eq!(config.fetch.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.fetch.max_redirects, 10);
        assert_eq!(config.cors_origin, "http://localhost:3000");
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/audits"),
            ("RUST_LOG", "debug"),
            ("FIX_MODEL", "gpt-4o"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("FIX_BATCH_SIZE", "2"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/audits"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.fix_model, "gpt-4o");
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.fix_batch_size, 2);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = Config::from_lookup(lookup(&[("FETCH_MAX_BYTES", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "FETCH_MAX_BYTES"));

        let err = Config::from_lookup(lookup(&[("FIX_BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "FIX_BATCH_SIZE"));

        let err = Config::from_lookup(lookup(&[("RUST_LOG", "chatty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "RUST_LOG"));
    }
}
