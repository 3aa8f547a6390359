// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI configuration
//!
//! Layered as: built-in defaults, then the TOML config file, then
//! `FERNFS_*` environment variables, then command-line flags.

use fernfs_providers::{AdapterConfig, AdapterKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
}

/// Log line encoding on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown log format: {other} (expected json or text)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: AdapterConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: AdapterConfig::local("data"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("dev", "fernfs", "fernfs") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("fernfs.toml")
        }
    }

    /// Load from `path`, or from the default location when it exists.
    /// Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// `DATA_DIR` is honoured for older deployments but loses to
    /// `FERNFS_STORAGE_BASE_PATH` when both are set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(kind) = lookup("FERNFS_STORAGE_TYPE") {
            self.storage.kind = kind.parse::<AdapterKind>().map_err(|e| ConfigError::Env {
                var: "FERNFS_STORAGE_TYPE",
                message: e.to_string(),
            })?;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.storage.base_path = dir;
        }
        if let Some(dir) = lookup("FERNFS_STORAGE_BASE_PATH") {
            self.storage.base_path = dir;
        }
        if let Some(level) = lookup("FERNFS_LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("FERNFS_LOGGING_FORMAT") {
            self.logging.format = format.parse().map_err(|message| ConfigError::Env {
                var: "FERNFS_LOGGING_FORMAT",
                message,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.kind, AdapterKind::Local);
        assert_eq!(config.storage.base_path, "data");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_full_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\ntype = \"local\"\nbase_path = \"/srv/fernfs\"\n\n[logging]\nlevel = \"debug\"\nformat = \"text\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage.base_path, "/srv/fernfs");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.storage.base_path, "data");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_is_parse_error() {
        let err = toml::from_str::<Config>("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_unknown_adapter_type_is_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[storage]\ntype = \"ftp\"\nbase_path = \"x\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/fernfs/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("DATA_DIR", "/legacy"),
                ("FERNFS_STORAGE_BASE_PATH", "/preferred"),
                ("FERNFS_LOGGING_LEVEL", "trace"),
                ("FERNFS_LOGGING_FORMAT", "Text"),
            ]))
            .unwrap();
        assert_eq!(config.storage.base_path, "/preferred");
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_legacy_data_dir() {
        let mut config = Config::default();
        config.apply_env(env(&[("DATA_DIR", "/legacy")])).unwrap();
        assert_eq!(config.storage.base_path, "/legacy");
    }

    #[test]
    fn test_bad_env_adapter_type() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("FERNFS_STORAGE_TYPE", "gopher")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "FERNFS_STORAGE_TYPE", .. }));
    }

    #[test]
    fn test_bad_env_log_format() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("FERNFS_LOGGING_FORMAT", "yaml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "FERNFS_LOGGING_FORMAT", .. }));
    }
}
