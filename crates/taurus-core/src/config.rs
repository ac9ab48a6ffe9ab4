//! Application configuration management.
//!
//! Holds settings that are not credentials: where credential files live and
//! how long HTTP requests may take.
//!
//! Configuration is stored at `~/.config/taurus/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{CredentialError, CredentialStore, ServiceProfile, DEFAULT_CREDENTIALS_FOLDER};

/// Application name used for the config directory path
const APP_NAME: &str = "taurus";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDirectory,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Folder under the home directory holding credential files
    pub credentials_folder: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDirectory)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn credentials_folder(&self) -> &str {
        self.credentials_folder
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS_FOLDER)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Credential store for `service` under the configured folder
    pub fn credential_store(
        &self,
        service: &'static ServiceProfile,
    ) -> Result<CredentialStore, CredentialError> {
        CredentialStore::with_folder(service, self.credentials_folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.credentials_folder(), ".credentials");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_load_written_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taurus").join("config.json");

        let config = Config {
            credentials_folder: Some(".etoro".to_string()),
            request_timeout_secs: Some(5),
        };
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.credentials_folder(), ".etoro");
        assert_eq!(loaded.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
