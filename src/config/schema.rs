//! Configuration schema for preview-cache
//!
//! Configuration is stored at `~/.config/preview-cache/config.toml`

use crate::provider::ProviderMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache and provider settings
    pub cache: CacheConfig,

    /// Import settings
    pub import: ImportConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append cache events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Which store set backs the persistent provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Disk,
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Provider mode: auto, ephemeral or persistent
    pub mode: ProviderMode,

    /// Origin addresses are served from
    pub origin: String,

    /// Virtual project root
    pub project_root: String,

    /// Store set for persistent addresses
    pub store: StoreBackend,

    /// Override the disk store location
    pub store_dir: Option<PathBuf>,

    /// Copy ephemeral content into the store as well
    pub mirror_ephemeral: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Auto,
            origin: "http://localhost:8000".to_string(),
            project_root: "/project".to_string(),
            store: StoreBackend::Disk,
            store_dir: None,
            mirror_ephemeral: false,
        }
    }
}

/// Import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Largest file accepted by an import, in bytes
    pub byte_limit: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            byte_limit: 3 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("mode = \"auto\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.project_root, "/project");
        assert_eq!(config.import.byte_limit, 3145728);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            mode = "persistent"
            store = "memory"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.mode, ProviderMode::Persistent);
        assert_eq!(config.cache.store, StoreBackend::Memory);
        assert_eq!(config.cache.origin, "http://localhost:8000"); // default preserved
    }
}
