//! Client Configuration
//!
//! Node endpoint and module location, persisted as JSON next to the
//! client's other data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AccountAddress, DomainError};
use crate::gateway::{TodoModule, DEFAULT_MODULE_NAME};

pub const CONFIG_FILE_NAME: &str = "ledger_todo_config.json";
pub const DEFAULT_NODE_URL: &str = "https://fullnode.devnet.aptoslabs.com/v1";
pub const DEFAULT_MODULE_ADDRESS: &str =
    "0x5448e45d5c73f4f44a91fe9bb11748e11e79153b4e4b658287c3f901d2ca4f78";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Fullnode REST endpoint, including the version prefix
    pub node_url: String,
    /// Account that published the todolist module
    pub module_address: String,
    pub module_name: String,
    /// Delay between finality polls
    pub poll_interval_ms: u64,
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            module_address: DEFAULT_MODULE_ADDRESS.to_string(),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            poll_interval_ms: 500,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Read config; a missing file is `Ok(None)`
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Load, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Validated module location
    pub fn module(&self) -> Result<TodoModule, ConfigError> {
        let address = AccountAddress::parse(&self.module_address)?;
        Ok(TodoModule::new(address, self.module_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(ClientConfig::load(&path).unwrap().is_none());
        assert_eq!(ClientConfig::load_or_default(&path).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            node_url: "http://127.0.0.1:8080/v1".to_string(),
            poll_interval_ms: 50,
            ..Default::default()
        };

        config.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"node_url":"http://localhost:8080/v1"}"#).unwrap();

        let config = ClientConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.node_url, "http://localhost:8080/v1");
        assert_eq!(config.module_name, DEFAULT_MODULE_NAME);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_module_resolves_default_address() {
        let module = ClientConfig::default().module().unwrap();
        assert_eq!(module.address.as_str(), DEFAULT_MODULE_ADDRESS);
        assert!(module.list_resource_type().ends_with("::todolist::TodoList"));
    }

    #[test]
    fn test_bad_module_address() {
        let config = ClientConfig {
            module_address: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.module(), Err(ConfigError::Domain(_))));
    }
}
