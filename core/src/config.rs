use crate::errors::{MedAiError, MedAiResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for the config directory
pub const APP_NAME: &str = "medai";

/// Base URL of the query service when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the query service base URL
pub const API_URL_ENV: &str = "MEDAI_API_URL";

/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV: &str = "MEDAI_LOG_LEVEL";

/// Configuration for the MedAI chat client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: Option<String>,
    pub log_level: Option<String>,
    pub expand_sources: Option<bool>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.to_string()),
            log_level: Some("warn".to_string()),
            expand_sources: Some(false),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration
    pub fn new(
        api_url: Option<String>,
        log_level: Option<String>,
        expand_sources: Option<bool>,
    ) -> Self {
        Self {
            api_url,
            log_level,
            expand_sources,
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> MedAiResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                MedAiError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                MedAiError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reads overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            api_url: read(API_URL_ENV),
            log_level: read(LOG_LEVEL_ENV),
            expand_sources: None,
        }
    }

    /// Defaults, then the config file, then the environment.
    ///
    /// `path` falls back to `$HOME/.config/medai/config.toml`.
    pub fn load(path: Option<&Path>) -> MedAiResult<Self> {
        let file_config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match get_default_config_file(APP_NAME) {
                Ok(path) => Self::load_from_file(&path)?,
                Err(_) => Self::default(),
            },
        };

        Ok(Self::default()
            .merge(&file_config)
            .merge(&Self::from_env()))
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_url: other.api_url.clone().or_else(|| self.api_url.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            expand_sources: other.expand_sources.or(self.expand_sources),
        }
    }

    /// Base URL of the query service, without a trailing slash
    pub fn api_base_url(&self) -> String {
        let url = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL);

        url.strip_suffix('/').unwrap_or(url).to_string()
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> MedAiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        MedAiError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> MedAiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
