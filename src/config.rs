//! Runtime configuration.
//!
//! Values come from environment variables, with the backend URL falling back
//! to the OS credential store.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RegistryError, RegistryResult};
use crate::storage;

pub const ENV_BACKEND_URL: &str = "CASH_REGISTRY_URL";
pub const ENV_TIMEOUT_SECS: &str = "CASH_REGISTRY_TIMEOUT_SECS";
pub const ENV_HEALTH_TIMEOUT_SECS: &str = "CASH_REGISTRY_HEALTH_TIMEOUT_SECS";
pub const ENV_LOG_DIR: &str = "CASH_REGISTRY_LOG_DIR";

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight reachability check.
const DEFAULT_CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_LOG_FILTER: &str = "info,salon_cash_registry=debug";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connectivity_timeout: Duration,
    pub logging: LoggingConfig,
}

impl RegistryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_TIMEOUT,
            connectivity_timeout: DEFAULT_CONNECTIVITY_TIMEOUT,
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_env() -> RegistryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), storage::get_credential)
    }

    /// Resolve configuration from `env`, consulting `stored` for the backend
    /// URL when the environment does not provide one.
    pub fn from_lookup(
        env: impl Fn(&str) -> Option<String>,
        stored: impl Fn(&str) -> Option<String>,
    ) -> RegistryResult<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let base_url = non_empty(env(ENV_BACKEND_URL))
            .or_else(|| non_empty(stored(storage::KEY_BACKEND_URL)))
            .ok_or_else(|| {
                RegistryError::validation(
                    "baseUrl",
                    format!("{ENV_BACKEND_URL} is not set and no backend URL is stored"),
                )
            })?;

        let mut config = Self::new(base_url.trim());
        if let Some(secs) = non_empty(env(ENV_TIMEOUT_SECS)) {
            config.request_timeout = parse_secs(ENV_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = non_empty(env(ENV_HEALTH_TIMEOUT_SECS)) {
            config.connectivity_timeout = parse_secs(ENV_HEALTH_TIMEOUT_SECS, &secs)?;
        }
        if let Some(dir) = non_empty(env(ENV_LOG_DIR)) {
            config.logging.log_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

fn parse_secs(name: &'static str, raw: &str) -> RegistryResult<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            RegistryError::validation(name, format!("{name} must be a positive number of seconds"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_values_override_defaults() {
        let config = RegistryConfig::from_lookup(
            lookup(&[
                (ENV_BACKEND_URL, " salon.example.com "),
                (ENV_TIMEOUT_SECS, "12"),
                (ENV_LOG_DIR, "/var/log/salon"),
            ]),
            lookup(&[]),
        )
        .unwrap();
        assert_eq!(config.base_url, "salon.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(config.connectivity_timeout, DEFAULT_CONNECTIVITY_TIMEOUT);
        assert_eq!(config.logging.log_dir, PathBuf::from("/var/log/salon"));
    }

    #[test]
    fn falls_back_to_stored_backend_url() {
        let config = RegistryConfig::from_lookup(
            lookup(&[]),
            lookup(&[(storage::KEY_BACKEND_URL, "https://api.salon.test")]),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://api.salon.test");
    }

    #[test]
    fn missing_url_and_bad_timeouts_are_rejected() {
        let err = RegistryConfig::from_lookup(lookup(&[]), lookup(&[])).unwrap_err();
        assert_eq!(err.field(), Some("baseUrl"));

        let err = RegistryConfig::from_lookup(
            lookup(&[(ENV_BACKEND_URL, "localhost:4000"), (ENV_TIMEOUT_SECS, "0")]),
            lookup(&[]),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some(ENV_TIMEOUT_SECS));
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        std::env::set_var(ENV_BACKEND_URL, "http://127.0.0.1:9");
        std::env::set_var(ENV_HEALTH_TIMEOUT_SECS, "3");
        let config = RegistryConfig::from_env();
        std::env::remove_var(ENV_BACKEND_URL);
        std::env::remove_var(ENV_HEALTH_TIMEOUT_SECS);

        let config = config.unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9");
        assert_eq!(config.connectivity_timeout, Duration::from_secs(3));
    }
}
