//! Package resolution entry point
//!
//! Built-in packages are answered from the static registry without I/O;
//! everything else goes through the [`PackageLoader`].

use crate::config::{Config, ConfigManager};
use crate::error::PackResult;
use crate::loader::{FileMetadataProvider, HttpBundleFetcher, PackageLoader};
use crate::package::{FactoryRegistry, SharedPackage, StaticRegistry};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which layer answered a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Builtin,
    Loader,
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Builtin => write!(f, "builtin"),
            PackageSource::Loader => write!(f, "loader"),
        }
    }
}

/// Static registry in front of the package loader
pub struct PackageResolver {
    registry: StaticRegistry,
    loader: Arc<PackageLoader>,
}

impl PackageResolver {
    pub fn new(registry: StaticRegistry, loader: Arc<PackageLoader>) -> Self {
        Self { registry, loader }
    }

    /// Resolver wired from configuration: built-in packages, the TOML
    /// registry file for metadata, and the HTTP fetcher for bundles
    pub fn from_config(config: &Config) -> PackResult<Self> {
        let factories = FactoryRegistry::with_defaults();
        let registry = StaticRegistry::builtin(&factories)?;

        let metadata = Arc::new(FileMetadataProvider::new(ConfigManager::registry_path(
            config,
        )));
        let fetcher = Arc::new(HttpBundleFetcher::new(
            Duration::from_secs(config.remote.timeout_secs),
            config.remote.max_bundle_bytes,
        ));
        let loader = PackageLoader::from_config(config, metadata, fetcher);

        Ok(Self::new(registry, Arc::new(loader)))
    }

    /// Resolve `id`, or `None` if no layer can provide it
    pub async fn get_package(&self, id: &str) -> Option<SharedPackage> {
        self.resolve(id).await.map(|(package, _)| package)
    }

    /// Like [`get_package`](Self::get_package), also reporting the source
    pub async fn resolve(&self, id: &str) -> Option<(SharedPackage, PackageSource)> {
        if let Some(package) = self.registry.get(id) {
            debug!(package_id = id, "Resolved built-in package");
            return Some((package, PackageSource::Builtin));
        }

        self.loader
            .load_package(id)
            .await
            .map(|package| (package, PackageSource::Loader))
    }

    pub fn registry(&self) -> &StaticRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<PackageLoader> {
        &self.loader
    }
}
