use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::rates::DEFAULT_ENDPOINT;

fn default_currencies() -> Vec<String> {
    vec!["USD".to_string(), "EUR".to_string()]
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_logger_name() -> String {
    "currency".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CbrProviderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CbrProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CbrProviderConfig {
    fn default() -> Self {
        CbrProviderConfig {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub cbr: CbrProviderConfig,
}

/// Where call log lines go.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Leveled `tracing` events.
    #[default]
    Logger,
    /// Plain lines appended to `log_file`, or stdout.
    Stream,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub sink: SinkKind,
    #[serde(default = "default_logger_name")]
    pub logger_name: String,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            sink: SinkKind::default(),
            logger_name: default_logger_name(),
            log_file: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: default_currencies(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ru", "xrates", "xrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currencies: ["USD", "CNY", "GBP"]
providers:
  cbr:
    endpoint: "http://example.com/daily_json.js"
    timeout_secs: 2
logging:
  sink: stream
  log_file: "currency_log.txt"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currencies, vec!["USD", "CNY", "GBP"]);
        assert_eq!(
            config.providers.cbr.endpoint,
            "http://example.com/daily_json.js"
        );
        assert_eq!(config.providers.cbr.timeout(), Duration::from_secs(2));
        assert_eq!(config.logging.sink, SinkKind::Stream);
        assert_eq!(config.logging.logger_name, "currency");
        assert_eq!(
            config.logging.log_file,
            Some(PathBuf::from("currency_log.txt"))
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("currencies: [\"JPY\"]").expect("Failed to deserialize");
        assert_eq!(config.currencies, vec!["JPY"]);
        assert_eq!(config.providers.cbr.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.providers.cbr.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.sink, SinkKind::Logger);
        assert!(config.logging.log_file.is_none());

        let config: AppConfig =
            serde_yaml::from_str("logging:\n  sink: logger\n").expect("Failed to deserialize");
        assert_eq!(config.currencies, vec!["USD", "EUR"]);
    }

    #[test]
    fn test_unknown_sink_is_rejected() {
        let result = serde_yaml::from_str::<AppConfig>("logging:\n  sink: syslog\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/definitely/not/here/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
