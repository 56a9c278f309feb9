use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Resolved logger settings, built from the `logging` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Rolling file output; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Console output on stderr. Forced on when there is no log directory.
    pub enable_console: bool,
    /// Only applies with a log directory
    pub rotation: RotationPolicy,
}

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl RotationPolicy {
    /// Parse a configured rotation name; unknown names keep daily rotation.
    pub fn parse(name: &str) -> Self {
        match name {
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(logging: &LoggingConfig) -> Self {
        Self {
            level: logging.level.clone(),
            format: if logging.format == "json" {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            log_dir: logging.log_dir.as_ref().map(PathBuf::from),
            enable_console: logging.console,
            rotation: RotationPolicy::parse(&logging.rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logging_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            log_dir: Some("/var/log/hostwarden".to_string()),
            rotation: "hourly".to_string(),
            console: false,
        };

        let config = LogConfig::from(&logging);

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/hostwarden")));
        assert!(!config.enable_console);
        assert_eq!(config.rotation, RotationPolicy::Hourly);
    }

    #[test]
    fn test_defaults_log_to_console_with_daily_rotation() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.enable_console);
        assert_eq!(config.rotation, RotationPolicy::Daily);
        assert_eq!(RotationPolicy::parse("never"), RotationPolicy::Never);
    }
}
