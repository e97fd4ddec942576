//! Application configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Replay/scanner settings
    pub scanner: ScannerConfig,

    /// Unauthenticated request check settings
    pub check: CheckConfig,
}

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default report format
    pub report_format: ReportFormat,

    /// Report title
    pub report_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum concurrent passive scans
    pub max_concurrent: usize,

    /// Replay timeout in seconds
    pub request_timeout: u64,

    /// Follow redirects on replay
    pub follow_redirects: bool,

    /// Maximum redirect depth
    pub max_redirects: usize,

    /// Accept self-signed and otherwise invalid certificates
    pub accept_invalid_certs: bool,

    /// User agent used when the replayed request carries none
    pub user_agent: String,

    /// Upstream proxy for replays (none means direct connections)
    pub upstream_proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Header names removed before the replay (case-insensitive)
    pub strip_headers: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            report_format: ReportFormat::Text,
            report_title: "Unauthenticated Request Check".to_string(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            request_timeout: 30,
            follow_redirects: false,
            max_redirects: 10,
            accept_invalid_certs: true,
            user_agent: format!("unauth-check/{}", env!("CARGO_PKG_VERSION")),
            upstream_proxy: None,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            strip_headers: vec!["Cookie".to_string(), "Authorization".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(|source| {
                ConfigError::ReadError {
                    path: config_path.display().to_string(),
                    source,
                }
            })?;

            let config: Config = toml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;

            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject settings the scanner cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.max_concurrent == 0 {
            return Err(ConfigError::ValidationError {
                field: "scanner.max_concurrent".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.scanner.request_timeout == 0 {
            return Err(ConfigError::ValidationError {
                field: "scanner.request_timeout".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.check.strip_headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: "check.strip_headers".into(),
                reason: "at least one header name is required".into(),
            });
        }

        if let Some(bad) = self
            .check
            .strip_headers
            .iter()
            .find(|h| h.contains(':') || h.chars().any(char::is_whitespace))
        {
            return Err(ConfigError::ValidationError {
                field: "check.strip_headers".into(),
                reason: format!("'{}' is not a header name", bad),
            });
        }

        Ok(())
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "unauth-check", "unauth-check")
            .context("Failed to determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "unauth-check", "unauth-check")
            .context("Failed to determine data directory")?;

        Ok(dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_strips_cookie_and_authorization() {
        let config = Config::default();
        assert_eq!(config.check.strip_headers, vec!["Cookie", "Authorization"]);
        assert!(!config.scanner.follow_redirects);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_file_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let mut config = Config::default();
        config.check.strip_headers.push("Authorize".to_string());
        config.scanner.request_timeout = 5;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(path_str)).unwrap();
        assert_eq!(loaded.check.strip_headers, vec!["Cookie", "Authorization", "Authorize"]);
        assert_eq!(loaded.scanner.request_timeout, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[scanner]\nmax_concurrent = 2\n").unwrap();

        let loaded = Config::load(path.to_str()).unwrap();
        assert_eq!(loaded.scanner.max_concurrent, 2);
        assert_eq!(loaded.scanner.request_timeout, 30);
        assert_eq!(loaded.check.strip_headers.len(), 2);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Config::load(path.to_str()).unwrap();
        assert_eq!(loaded.general.report_format, ReportFormat::Text);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[scanner\n").unwrap();

        let err = Config::load(path.to_str()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scanner.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.check.strip_headers.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.check.strip_headers = vec!["Cookie:".into()];
        assert!(config.validate().is_err());
    }
}
