//! Package metadata providers
//!
//! The loader never invents bundle locations: it asks a provider where a
//! package's bundle lives and which checksum it should have.

use crate::error::{PackError, PackResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Where a package's bundle lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Remote URL of the bundle
    pub bundle_path: String,

    /// Authoritative checksum, if the registry has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl PackageMetadata {
    pub fn new(bundle_path: impl Into<String>, checksum: Option<String>) -> Self {
        Self {
            bundle_path: bundle_path.into(),
            checksum,
        }
    }
}

/// Source of package metadata, keyed by package id
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Metadata for `id`, or `None` if the id is unknown
    async fn package_metadata(&self, id: &str) -> PackResult<Option<PackageMetadata>>;
}

/// In-memory provider
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    packages: RwLock<HashMap<String, PackageMetadata>>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, metadata: PackageMetadata) {
        self.packages.write().insert(id.into(), metadata);
    }

    pub fn remove(&self, id: &str) -> Option<PackageMetadata> {
        self.packages.write().remove(id)
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn package_metadata(&self, id: &str) -> PackResult<Option<PackageMetadata>> {
        Ok(self.packages.read().get(id).cloned())
    }
}

/// Contents of a `packages.toml` registry file
///
/// ```toml
/// [packages.acme-support]
/// bundle_path = "https://storage.example.com/bundles/acme-support.json"
/// checksum = "9f86d081884c7d65..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub packages: BTreeMap<String, PackageMetadata>,
}

impl RegistryFile {
    pub fn parse(content: &str) -> PackResult<Self> {
        toml::from_str(content).map_err(|e| PackError::Registry(e.to_string()))
    }
}

/// Provider backed by a TOML registry file, re-read on every lookup
#[derive(Debug, Clone)]
pub struct FileMetadataProvider {
    path: PathBuf,
}

impl FileMetadataProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole registry; a missing file is an empty registry
    pub async fn load(&self) -> PackResult<RegistryFile> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => RegistryFile::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Registry file {} not found", self.path.display());
                Ok(RegistryFile::default())
            }
            Err(e) => Err(PackError::io(
                format!("reading registry {}", self.path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl MetadataProvider for FileMetadataProvider {
    async fn package_metadata(&self, id: &str) -> PackResult<Option<PackageMetadata>> {
        let mut registry = self.load().await?;
        Ok(registry.packages.remove(id))
    }
}
