//! Runtime configuration.
//!
//! Everything here is optional: `RuntimeConfig::default()` is a working
//! setup. API keys are never read from this file, only from the
//! environment (see [`crate::providers::secrets`]).
//!
//! ```yaml
//! health:
//!   failure_threshold: 3
//!   cooldown: 10m
//!   heal_after: 30m
//! batch:
//!   default_concurrency: 4
//!   max_concurrency: 16
//! attempt_log: /var/log/georoute/attempts.log
//! providers:
//!   disabled: [graphhopper]
//!   overrides:
//!     osrm:
//!       timeout: 2s
//!       rate_limit_per_minute: 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::resilience::HealthPolicy;

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Circuit breaker thresholds, shared by every provider
    #[serde(default)]
    pub health: HealthPolicy,

    #[serde(default)]
    pub batch: BatchConfig,

    /// Where to append the per-attempt log; disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_log: Option<PathBuf>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "health.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.batch.default_concurrency == 0 || self.batch.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "batch concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.batch.default_concurrency > self.batch.max_concurrency {
            return Err(ConfigError::Invalid(format!(
                "batch.default_concurrency ({}) exceeds batch.max_concurrency ({})",
                self.batch.default_concurrency, self.batch.max_concurrency
            )));
        }
        for (name, over) in &self.providers.overrides {
            if over.rate_limit_per_minute == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "providers.overrides.{}.rate_limit_per_minute must be at least 1",
                    name
                )));
            }
            if over.timeout == Some(Duration::ZERO) {
                return Err(ConfigError::Invalid(format!(
                    "providers.overrides.{}.timeout must be non-zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Batch fan-out limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Used when a request does not carry `concurrencyCap`
    pub default_concurrency: usize,

    /// Hard ceiling applied to any requested cap
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 4,
            max_concurrency: 16,
        }
    }
}

impl BatchConfig {
    /// Effective concurrency for a request, clamped to `1..=max_concurrency`.
    pub fn effective_concurrency(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_concurrency)
            .clamp(1, self.max_concurrency.max(1))
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("georoute/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Which built-in providers to use and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider names removed from the cascade
    pub disabled: Vec<String>,

    /// Per-provider limit overrides, keyed by provider name
    pub overrides: BTreeMap<String, ProviderOverride>,
}

/// Per-provider overrides. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderOverride {
    #[serde(with = "human_duration::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
}

/// Durations written the way people write them: `"10m"`, `"1h 30m"`, `"500ms"`.
pub(crate) mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.health.cooldown, Duration::from_secs(600));
        assert_eq!(config.health.heal_after, Duration::from_secs(1800));
        assert_eq!(config.batch.default_concurrency, 4);
        assert!(config.attempt_log.is_none());
        assert!(config.http.user_agent.starts_with("georoute/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
health:
  failure_threshold: 5
  cooldown: 2m
  heal_after: 1h
batch:
  default_concurrency: 2
  max_concurrency: 8
attempt_log: /tmp/attempts.log
http:
  user_agent: test-agent
providers:
  disabled: [graphhopper]
  overrides:
    osrm:
      timeout: 1500ms
      rate_limit_per_minute: 10
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.health.failure_threshold, 5);
        assert_eq!(config.health.cooldown, Duration::from_secs(120));
        assert_eq!(config.health.heal_after, Duration::from_secs(3600));
        assert_eq!(config.batch.max_concurrency, 8);
        assert_eq!(config.attempt_log, Some(PathBuf::from("/tmp/attempts.log")));
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.providers.disabled, vec!["graphhopper".to_string()]);

        let osrm = &config.providers.overrides["osrm"];
        assert_eq!(osrm.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(osrm.rate_limit_per_minute, Some(10));
    }

    #[test]
    fn test_partial_health_keeps_other_defaults() {
        let config = RuntimeConfig::from_yaml("health:\n  cooldown: 30s\n").unwrap();
        assert_eq!(config.health.cooldown, Duration::from_secs(30));
        assert_eq!(config.health.failure_threshold, 3);
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = RuntimeConfig::from_yaml("health:\n  cooldown: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_rejects_unknown_top_level_key() {
        assert!(RuntimeConfig::from_yaml("retries: 3\n").is_err());
    }

    #[test]
    fn test_rejects_inverted_concurrency() {
        let yaml = "batch:\n  default_concurrency: 20\n  max_concurrency: 4\n";
        let err = RuntimeConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_rejects_zero_rate_override() {
        let yaml = "providers:\n  overrides:\n    here:\n      rate_limit_per_minute: 0\n";
        let err = RuntimeConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("here"));
    }

    #[test]
    fn test_effective_concurrency_clamps() {
        let batch = BatchConfig::default();
        assert_eq!(batch.effective_concurrency(None), 4);
        assert_eq!(batch.effective_concurrency(Some(0)), 1);
        assert_eq!(batch.effective_concurrency(Some(8)), 8);
        assert_eq!(batch.effective_concurrency(Some(500)), 16);
    }

    #[test]
    fn test_duration_serializes_human_readable() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default()).unwrap();
        assert!(yaml.contains("cooldown: 10m"));
        assert!(yaml.contains("heal_after: 30m"));
    }
}
