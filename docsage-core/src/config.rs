//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/docsage/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/docsage/` (~/.config/docsage/)
//! - Data: `$XDG_DATA_HOME/docsage/` (~/.local/share/docsage/)
//! - State/Logs: `$XDG_STATE_HOME/docsage/` (~/.local/state/docsage/)

use crate::error::{Error, Result};
use crate::types::Language;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analysis service endpoint configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// UI defaults
    #[serde(default)]
    pub ui: UiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis service endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Service origin (e.g., `http://localhost:8000`); `/api` is appended
    /// per request
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// The `/api` base every endpoint hangs off of.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("backend.base_url must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "backend.base_url must start with http:// or https:// (got {:?})",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "backend.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// UI defaults
#[derive(Debug, Deserialize, Default)]
pub struct UiConfig {
    /// Initial answer language; toggleable at runtime
    #[serde(default)]
    pub language: Language,

    /// Where decoded reports are written; defaults to the platform download
    /// folder
    pub download_dir: Option<PathBuf>,
}

impl UiConfig {
    /// Resolve the report download directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        dirs::download_dir().unwrap_or_else(|| Config::data_dir().join("reports"))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/docsage/config.toml` (~/.config/docsage/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("docsage").join("config.toml")
    }

    /// Returns the data directory path (for the persisted session)
    ///
    /// `$XDG_DATA_HOME/docsage/` (~/.local/share/docsage/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("docsage")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/docsage/` (~/.local/state/docsage/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("docsage")
    }

    /// Returns the persisted session file path
    ///
    /// `$XDG_DATA_HOME/docsage/session.json` (~/.local/share/docsage/session.json)
    pub fn session_path() -> PathBuf {
        Self::data_dir().join("session.json")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// Binaries call this before touching any on-disk state so path behavior
    /// is stable across invocations.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.ui.language, Language::En);
        assert!(config.ui.download_dir.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[backend]
base_url = "https://analysis.example.com"
timeout_secs = 60

[ui]
language = "id"
download_dir = "/tmp/reports"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.backend.base_url, "https://analysis.example.com");
        assert_eq!(config.backend.timeout_secs, 60);
        assert_eq!(config.ui.language, Language::Id);
        assert_eq!(
            config.ui.download_dir,
            Some(PathBuf::from("/tmp/reports"))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_api_base_trims_trailing_slash() {
        let backend = BackendConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.api_base(), "http://localhost:8000/api");

        let backend = BackendConfig::default();
        assert_eq!(backend.api_base(), "http://localhost:8000/api");
    }

    #[test]
    fn test_backend_validation() {
        assert!(BackendConfig::default().validate().is_ok());

        let empty = BackendConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let no_scheme = BackendConfig {
            base_url: "analysis.example.com".to_string(),
            ..Default::default()
        };
        assert!(no_scheme.validate().is_err());

        let zero_timeout = BackendConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());
    }
}
