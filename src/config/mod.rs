//! Configuration management for preview-cache

pub mod schema;

pub use schema::{CacheConfig, Config, StoreBackend};

use crate::error::{PreviewError, PreviewResult};
use crate::store::{DiskStoreSet, MemoryStoreSet, StoreSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("preview-cache")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("preview-cache")
    }

    /// Get the disk store directory path
    pub fn stores_dir() -> PathBuf {
        Self::state_dir().join("stores")
    }

    /// Get the event journal path
    pub fn journal_path() -> PathBuf {
        Self::state_dir().join("journal.log")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PreviewResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PreviewResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PreviewError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| PreviewError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PreviewResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PreviewError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PreviewResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PreviewError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the store set selected by `config`
pub fn store_set(config: &CacheConfig) -> Arc<dyn StoreSet> {
    match config.store {
        StoreBackend::Memory => Arc::new(MemoryStoreSet::new()),
        StoreBackend::Disk => {
            let dir = config
                .store_dir
                .clone()
                .unwrap_or_else(ConfigManager::stores_dir);
            Arc::new(DiskStoreSet::new(dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.origin, "http://localhost:8000");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.project_root = "/7/projects/30".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.project_root, "/7/projects/30");
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmode = \"sideways\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            PreviewError::ConfigInvalid { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn store_set_follows_backend() {
        let mut config = CacheConfig {
            store: StoreBackend::Memory,
            ..CacheConfig::default()
        };
        assert_eq!(store_set(&config).name(), "memory");

        config.store = StoreBackend::Disk;
        config.store_dir = Some(PathBuf::from("/tmp/preview-cache-test"));
        assert_eq!(store_set(&config).name(), "disk");
    }
}
