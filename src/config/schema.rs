//! Configuration schema for agentpack
//!
//! Configuration is stored at `~/.config/agentpack/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// In-memory package cache
    pub memory: MemoryConfig,

    /// On-disk bundle cache
    pub disk: DiskConfig,

    /// Remote object storage access
    pub remote: RemoteConfig,

    /// Package loader settings
    pub loader: LoaderConfig,

    /// Package metadata registry
    pub registry: RegistryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Memory tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Lifetime of a memory entry in seconds (default: 30 minutes)
    pub ttl_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 * 60 }
    }
}

/// Disk tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Enable the disk tier (default: true)
    pub enabled: bool,

    /// Cache directory (defaults to the state dir)
    pub dir: Option<PathBuf>,

    /// Lifetime of a disk entry in seconds (default: 7 days)
    pub ttl_secs: u64,

    /// Maximum total bundle size in MB before eviction
    pub max_size_mb: u64,

    /// Entries younger than this are never evicted for size
    pub eviction_grace_secs: u64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_secs: 7 * 24 * 60 * 60,
            max_size_mb: 500,
            eviction_grace_secs: 0,
        }
    }
}

impl DiskConfig {
    /// Budget in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Remote fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Largest bundle accepted from object storage
    pub max_bundle_bytes: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bundle_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Package loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory for temporary bundle files during materialization
    pub staging_dir: Option<PathBuf>,

    /// Upper bound on materializing a single bundle, in seconds
    pub materialize_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            materialize_timeout_secs: 10,
        }
    }
}

/// Package metadata registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the packages.toml registry file
    pub path: Option<PathBuf>,
}

impl Config {
    /// Reject settings the loader cannot operate with
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        if self.memory.ttl_secs == 0 {
            return Err("memory.ttl_secs must be greater than 0".to_string());
        }
        if self.disk.ttl_secs == 0 {
            return Err("disk.ttl_secs must be greater than 0".to_string());
        }
        if self.disk.max_size_mb == 0 {
            return Err("disk.max_size_mb must be greater than 0".to_string());
        }
        if self.remote.timeout_secs == 0 {
            return Err("remote.timeout_secs must be greater than 0".to_string());
        }
        if self.remote.max_bundle_bytes == 0 {
            return Err("remote.max_bundle_bytes must be greater than 0".to_string());
        }
        if self.loader.materialize_timeout_secs == 0 {
            return Err("loader.materialize_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
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
        assert!(toml.contains("[disk]"));
        assert!(toml.contains("[remote]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.memory.ttl_secs, 1800);
        assert_eq!(config.disk.ttl_secs, 604_800);
        assert_eq!(config.disk.max_size_mb, 500);
        assert!(config.disk.enabled);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [disk]
            max_size_mb = 64
            dir = "/var/cache/agentpack"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.disk.max_size_mb, 64);
        assert_eq!(config.disk.max_size_bytes(), 64 * 1024 * 1024);
        assert_eq!(config.disk.dir, Some(PathBuf::from("/var/cache/agentpack")));
        assert_eq!(config.disk.ttl_secs, 604_800); // default preserved
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.memory.ttl_secs = 0;
        assert!(config.validate().unwrap_err().contains("memory.ttl_secs"));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.general.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
