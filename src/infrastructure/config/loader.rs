use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid agent port: {0}. Must be between 1 and 65535")]
    InvalidAgentPort(u16),

    #[error("Invalid agent scheme: {0}. Must be one of: http, https")]
    InvalidAgentScheme(String),

    #[error("Cluster id cannot be empty")]
    EmptyClusterId,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. hostwarden.yaml
    /// 3. hostwarden.local.yaml (optional local overrides)
    /// 4. Environment variables (HOSTWARDEN_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("hostwarden.yaml"))
            .merge(Yaml::file("hostwarden.local.yaml"))
            .merge(Env::prefixed("HOSTWARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("HOSTWARDEN_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if !["daily", "hourly", "never"].contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if config.agent.port == 0 {
            return Err(ConfigError::InvalidAgentPort(config.agent.port));
        }

        if !["http", "https"].contains(&config.agent.scheme.as_str()) {
            return Err(ConfigError::InvalidAgentScheme(config.agent.scheme.clone()));
        }

        if config.clusters.keys().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::EmptyClusterId);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::HaOverrides;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.agent.port, 8080);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_invalid_log_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogRotation(_))
        ));
    }

    #[test]
    fn test_validate_agent_settings() {
        let mut config = Config::default();
        config.agent.port = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAgentPort(0))
        ));

        let mut config = Config::default();
        config.agent.scheme = "ftp".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAgentScheme(_))
        ));
    }

    #[test]
    fn test_validate_empty_cluster_id() {
        let mut config = Config::default();
        config.clusters.insert(" ".to_string(), HaOverrides::default());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyClusterId)
        ));
    }

    #[test]
    fn test_load_from_file_with_cluster_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r"
ha:
  accepted_problematic_hosts_ratio: 0.4
clusters:
  rack-a:
    recover_attempt_threshold: 3
agent:
  port: 8250
"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();

        assert!((config.ha.accepted_problematic_hosts_ratio - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.ha.fence_timeout_secs, 60);
        assert_eq!(config.clusters["rack-a"].recover_attempt_threshold, Some(3));
        assert_eq!(config.clusters["rack-a"].fence_timeout_secs, None);
        assert_eq!(config.agent.port, 8250);
    }

    #[test]
    fn test_mistyped_ha_values_do_not_fail_the_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r"
ha:
  activity_check_max_attempts: -3
  fence_timeout_secs: soon
  recover_wait_period_secs: 120
clusters:
  rack-a:
    recover_timeout_secs: later
    recover_attempt_threshold: 2
"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();

        assert_eq!(config.ha.activity_check_max_attempts, 10);
        assert_eq!(config.ha.fence_timeout_secs, 60);
        assert_eq!(config.ha.recover_wait_period_secs, 120);
        assert_eq!(config.clusters["rack-a"].recover_timeout_secs, None);
        assert_eq!(config.clusters["rack-a"].recover_attempt_threshold, Some(2));
    }

    #[test]
    fn test_env_override() {
        let file = NamedTempFile::new().unwrap();
        temp_env::with_vars(
            [
                ("HOSTWARDEN_HA__CAUTIOUS_MARGIN", Some("2")),
                ("HOSTWARDEN_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.ha.cautious_margin, 2);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "ha:\n  fence_timeout_secs: 30\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "ha:\n  fence_timeout_secs: 45\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.ha.fence_timeout_secs, 45, "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.ha.recover_wait_period_secs, 600);
    }
}
