//! Package loader
//!
//! Resolves a package id through three tiers, in strict order:
//!
//! 1. Memory cache, returned immediately when fresh
//! 2. Disk cache, trusted only when its checksum matches the registry's
//! 3. Remote object storage, which then populates both local tiers
//!
//! The loader is the error boundary of the subsystem: every failure is
//! logged, counted, and turned into `None`. Callers treat `None` as
//! "package unavailable".

pub mod fetch;
pub mod metadata;
pub mod module;
pub mod stats;

pub use fetch::{BundleFetcher, HttpBundleFetcher};
pub use metadata::{
    FileMetadataProvider, MetadataProvider, PackageMetadata, RegistryFile, StaticMetadataProvider,
};
pub use module::ModuleLoader;
pub use stats::LoaderStats;

use crate::cache::{DiskCache, DiskCacheOptions, MemoryCache};
use crate::checksum::{checksums_match, compute_checksum, short_checksum};
use crate::clock::{self, Clock, SystemClock};
use crate::config::{Config, ConfigManager};
use crate::error::{PackError, PackResult};
use crate::package::{validate_package_id, FactoryRegistry, SharedPackage};
use futures_util::future::join_all;
use serde::Serialize;
use stats::StatsRecorder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Aggregate outcome of `preload_packages`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Builder for [`PackageLoader`]
pub struct PackageLoaderBuilder {
    metadata: Arc<dyn MetadataProvider>,
    fetcher: Arc<dyn BundleFetcher>,
    clock: Arc<dyn Clock>,
    memory_ttl: chrono::Duration,
    disk: DiskCacheOptions,
    staging_dir: Option<PathBuf>,
    factories: FactoryRegistry,
    fetch_timeout: Duration,
    materialize_timeout: Duration,
}

impl PackageLoaderBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn memory_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.memory_ttl = ttl;
        self
    }

    pub fn disk_options(mut self, options: DiskCacheOptions) -> Self {
        self.disk = options;
        self
    }

    /// Directory for temporary bundle files (default: `{tmp}/agentpack-staging`)
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn materialize_timeout(mut self, timeout: Duration) -> Self {
        self.materialize_timeout = timeout;
        self
    }

    pub fn build(self) -> PackageLoader {
        let staging_dir = self
            .staging_dir
            .unwrap_or_else(module::default_staging_dir);

        PackageLoader {
            memory: MemoryCache::new(self.memory_ttl, Arc::clone(&self.clock)),
            disk: DiskCache::new(self.disk, self.clock),
            modules: ModuleLoader::new(staging_dir, self.factories, self.materialize_timeout),
            metadata: self.metadata,
            fetcher: self.fetcher,
            stats: StatsRecorder::default(),
            fetch_timeout: self.fetch_timeout,
        }
    }
}

/// Three-tier package resolver with load statistics
pub struct PackageLoader {
    memory: MemoryCache,
    disk: DiskCache,
    modules: ModuleLoader,
    metadata: Arc<dyn MetadataProvider>,
    fetcher: Arc<dyn BundleFetcher>,
    stats: StatsRecorder,
    fetch_timeout: Duration,
}

impl PackageLoader {
    /// Start building a loader that caches bundles under `cache_dir`
    pub fn builder(
        metadata: Arc<dyn MetadataProvider>,
        fetcher: Arc<dyn BundleFetcher>,
        cache_dir: impl Into<PathBuf>,
    ) -> PackageLoaderBuilder {
        PackageLoaderBuilder {
            metadata,
            fetcher,
            clock: Arc::new(SystemClock),
            memory_ttl: clock::secs(crate::cache::memory::DEFAULT_MEMORY_TTL_SECS),
            disk: DiskCacheOptions::new(cache_dir),
            staging_dir: None,
            factories: FactoryRegistry::with_defaults(),
            fetch_timeout: fetch::REQUEST_TIMEOUT,
            materialize_timeout: module::MATERIALIZE_TIMEOUT,
        }
    }

    /// Loader configured from the `[memory]`, `[disk]`, `[remote]` and
    /// `[loader]` sections
    pub fn from_config(
        config: &Config,
        metadata: Arc<dyn MetadataProvider>,
        fetcher: Arc<dyn BundleFetcher>,
    ) -> PackageLoader {
        let disk = DiskCacheOptions::from_config(config);

        Self::builder(metadata, fetcher, disk.dir.clone())
            .memory_ttl(clock::secs(config.memory.ttl_secs))
            .disk_options(disk)
            .staging_dir(ConfigManager::staging_dir(config))
            .fetch_timeout(Duration::from_secs(config.remote.timeout_secs))
            .materialize_timeout(Duration::from_secs(config.loader.materialize_timeout_secs))
            .build()
    }

    /// Resolve a package through memory, disk and remote tiers.
    ///
    /// Never fails: errors are logged, counted and reported as `None`.
    pub async fn load_package(&self, id: &str) -> Option<SharedPackage> {
        if let Some(package) = self.memory.get(id) {
            self.stats.memory_hit();
            debug!(package_id = id, "Memory cache hit");
            return Some(package);
        }
        self.stats.memory_miss();

        let started = Instant::now();
        match self.load_uncached(id).await {
            Ok(package) => {
                self.stats.load_time(started.elapsed());
                Some(package)
            }
            Err(e) => {
                self.stats.error();
                error!(package_id = id, "Failed to load package: {}", e);
                None
            }
        }
    }

    async fn load_uncached(&self, id: &str) -> PackResult<SharedPackage> {
        validate_package_id(id)?;

        let metadata = self
            .metadata
            .package_metadata(id)
            .await?
            .ok_or_else(|| PackError::PackageNotFound(id.to_string()))?;

        if let Some((package, checksum)) = self.load_from_disk(id, &metadata).await {
            self.memory.set(id, Arc::clone(&package), &checksum);
            self.stats.disk_hit();
            debug!(
                package_id = id,
                checksum = short_checksum(&checksum),
                "Disk cache hit"
            );
            return Ok(package);
        }
        self.stats.disk_miss();

        self.load_from_remote(id, &metadata).await
    }

    /// Disk tier. Every failure here is a miss, never an error.
    async fn load_from_disk(
        &self,
        id: &str,
        metadata: &PackageMetadata,
    ) -> Option<(SharedPackage, String)> {
        let path = self.disk.get_path(id).await?;
        let entry = self.disk.get_entry(id).await?;

        if let Some(ref expected) = metadata.checksum {
            if !checksums_match(expected, &entry.checksum) {
                debug!(
                    package_id = id,
                    cached = short_checksum(&entry.checksum),
                    expected = short_checksum(expected),
                    "Disk cache entry is stale"
                );
                return None;
            }
        }

        match self.modules.materialize_file(id, &path).await {
            Ok(package) => Some((package, entry.checksum)),
            Err(e) => {
                warn!(
                    package_id = id,
                    "Cached bundle {} failed to load, falling back to remote: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    async fn load_from_remote(
        &self,
        id: &str,
        metadata: &PackageMetadata,
    ) -> PackResult<SharedPackage> {
        let code = match tokio::time::timeout(
            self.fetch_timeout,
            self.fetcher.fetch(&metadata.bundle_path),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(PackError::Timeout {
                    operation: format!("fetching {}", metadata.bundle_path),
                    secs: self.fetch_timeout.as_secs(),
                })
            }
        };

        let package = self.modules.materialize_source(id, &code).await?;

        let checksum = metadata
            .checksum
            .clone()
            .unwrap_or_else(|| compute_checksum(&code));

        self.memory.set(id, Arc::clone(&package), &checksum);
        if let Err(e) = self.disk.set(id, &code, &checksum).await {
            warn!(package_id = id, "Failed to write bundle to disk cache: {}", e);
        }

        self.stats.remote_load();
        info!(
            package_id = id,
            checksum = short_checksum(&checksum),
            "Loaded package from {}",
            metadata.bundle_path
        );
        Ok(package)
    }

    /// Drop a package from both local tiers
    pub async fn invalidate_package(&self, id: &str) {
        self.memory.delete(id);
        if let Err(e) = self.disk.delete(id).await {
            warn!(package_id = id, "Failed to remove package from disk cache: {}", e);
        }
        debug!(package_id = id, "Invalidated package");
    }

    /// Empty both local tiers
    pub async fn clear_package_cache(&self) {
        self.memory.clear();
        if let Err(e) = self.disk.clear().await {
            warn!("Failed to clear disk cache: {}", e);
        }
        info!("Cleared package cache");
    }

    /// Load packages concurrently, tolerating individual failures
    pub async fn preload_packages<S: AsRef<str>>(&self, ids: &[S]) -> PreloadSummary {
        self.preload_packages_with(ids, |_, _| {}).await
    }

    /// [`preload_packages`](Self::preload_packages), calling `on_loaded`
    /// as each package finishes
    pub async fn preload_packages_with<S, F>(&self, ids: &[S], on_loaded: F) -> PreloadSummary
    where
        S: AsRef<str>,
        F: Fn(&str, bool),
    {
        let on_loaded = &on_loaded;
        let loads = ids.iter().map(|id| async move {
            let id = id.as_ref();
            let ok = self.load_package(id).await.is_some();
            on_loaded(id, ok);
            (id.to_string(), ok)
        });

        let mut summary = PreloadSummary::default();
        for (id, ok) in join_all(loads).await {
            if ok {
                summary.succeeded.push(id);
            } else {
                summary.failed.push(id);
            }
        }

        info!(
            "Preloaded {} packages ({} failed)",
            summary.succeeded.len(),
            summary.failed.len()
        );
        summary
    }

    /// Ids currently held in memory
    pub fn cached_package_ids(&self) -> Vec<String> {
        self.memory.keys()
    }

    pub fn memory_cache_size(&self) -> usize {
        self.memory.len()
    }

    pub fn loader_stats(&self) -> LoaderStats {
        self.stats.snapshot()
    }

    pub fn reset_loader_stats(&self) {
        self.stats.reset();
    }

    pub fn memory_cache(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk_cache(&self) -> &DiskCache {
        &self.disk
    }
}
