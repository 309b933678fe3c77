use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_FEED_TIMEOUT_SECS, DEFAULT_PROPAGATION_SECS,
    DEFAULT_VERIFY_BRANCH, DEFAULT_VERIFY_SERVICE, MONITORING_BASE_URL, WAIT_TIME_FEED_URL,
};
use crate::error::{MetricsError, Result};
use crate::types::Service;

pub const FEED_URL_ENV: &str = "RMV_FEED_URL";
pub const MONITORING_BASE_URL_ENV: &str = "RMV_MONITORING_BASE_URL";
pub const PROPAGATION_SECS_ENV: &str = "RMV_DESCRIPTOR_PROPAGATION_SECS";

/// Runtime settings for a publishing run.
///
/// Every field has a default, so a missing `config.toml` is equivalent to an
/// empty one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed_url: String,
    pub feed_timeout_secs: u64,
    pub monitoring_base_url: String,
    pub api_timeout_secs: u64,
    pub descriptor_propagation_secs: u64,
    pub verify_branch: Option<String>,
    pub verify_service: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: WAIT_TIME_FEED_URL.to_string(),
            feed_timeout_secs: DEFAULT_FEED_TIMEOUT_SECS,
            monitoring_base_url: MONITORING_BASE_URL.to_string(),
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            descriptor_propagation_secs: DEFAULT_PROPAGATION_SECS,
            verify_branch: Some(DEFAULT_VERIFY_BRANCH.to_string()),
            verify_service: Some(DEFAULT_VERIFY_SERVICE.to_string()),
        }
    }
}

impl Config {
    /// Load from `path` if it exists, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                MetricsError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            debug!("Loaded config from {}", path.display());
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the environment; `lookup` is injected for tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(FEED_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.feed_url = url;
        }
        if let Some(url) = lookup(MONITORING_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.monitoring_base_url = url;
        }
        if let Some(secs) = lookup(PROPAGATION_SECS_ENV) {
            self.descriptor_propagation_secs = secs.trim().parse().map_err(|_| {
                MetricsError::Config(format!("{} must be a whole number of seconds, got '{}'", PROPAGATION_SECS_ENV, secs))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed_url.trim().is_empty() {
            return Err(MetricsError::Config("feed_url must not be empty".into()));
        }
        if self.monitoring_base_url.trim().is_empty() {
            return Err(MetricsError::Config("monitoring_base_url must not be empty".into()));
        }
        if self.feed_timeout_secs == 0 || self.api_timeout_secs == 0 {
            return Err(MetricsError::Config("timeouts must be at least one second".into()));
        }
        if let Some(service) = &self.verify_service {
            Service::from_name(service).ok_or_else(|| {
                MetricsError::Config(format!("unknown verify_service '{}'", service))
            })?;
        }
        Ok(())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn propagation_delay(&self) -> Duration {
        Duration::from_secs(self.descriptor_propagation_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let mut config: Config = toml::from_str("").unwrap();
        config.apply_env_overrides(|_| None).unwrap();
        assert_eq!(config.feed_url, WAIT_TIME_FEED_URL);
        assert_eq!(config.descriptor_propagation_secs, 5);
        assert_eq!(config.verify_branch.as_deref(), Some("Boston"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "feed_timeout_secs = 10\nverify_service = \"licensing\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_timeout_secs, 10);
        assert_eq!(config.verify_service.as_deref(), Some("licensing"));
        assert_eq!(config.api_timeout_secs, DEFAULT_API_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (FEED_URL_ENV, "http://localhost:1234/feed"),
            (PROPAGATION_SECS_ENV, "0"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.feed_url, "http://localhost:1234/feed");
        assert_eq!(config.descriptor_propagation_secs, 0);
        assert_eq!(config.monitoring_base_url, MONITORING_BASE_URL);
    }

    #[test]
    fn test_invalid_propagation_override() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == PROPAGATION_SECS_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(MetricsError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_service() {
        let config = Config {
            verify_service: Some("inspection".into()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
