//! Configuration management for agentpack

pub mod schema;

pub use schema::Config;

use crate::error::{PackError, PackResult};
use crate::loader::module::default_staging_dir;
use std::path::{Path, PathBuf};
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
        Self::config_dir().join("config.toml")
    }

    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agentpack")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agentpack")
    }

    /// Default disk cache directory
    pub fn default_cache_dir() -> PathBuf {
        Self::state_dir().join("packages")
    }

    /// Default package registry file
    pub fn default_registry_path() -> PathBuf {
        Self::config_dir().join("packages.toml")
    }

    /// Disk cache directory for a config, falling back to the default
    pub fn cache_dir(config: &Config) -> PathBuf {
        config
            .disk
            .dir
            .clone()
            .unwrap_or_else(Self::default_cache_dir)
    }

    /// Staging directory for bundle materialization
    pub fn staging_dir(config: &Config) -> PathBuf {
        config
            .loader
            .staging_dir
            .clone()
            .unwrap_or_else(default_staging_dir)
    }

    /// Registry file for a config, falling back to the default
    pub fn registry_path(config: &Config) -> PathBuf {
        config
            .registry
            .path
            .clone()
            .unwrap_or_else(Self::default_registry_path)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PackResult<Config> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PackResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PackError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| PackError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate().map_err(|reason| PackError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PackResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PackError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PackResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PackError::ConfigDirCreate {
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
