//! On-disk bundle cache
//!
//! Bundles live at `{dir}/{id}.json`, indexed by `{dir}/manifest.json`.
//! The tier enforces a total-size budget (oldest-first eviction) and a TTL.
//!
//! Manifest read-modify-write operations are serialized through a single
//! async lock per `DiskCache`. Separate processes sharing a directory are
//! not coordinated and can still lose each other's manifest updates.

use crate::cache::manifest::{DiskCacheEntry, DiskCacheManifest, MANIFEST_FILE};
use crate::checksum::{checksums_match, short_checksum};
use crate::clock::{self, Clock};
use crate::config::{Config, ConfigManager};
use crate::error::{PackError, PackResult};
use crate::package::validate_package_id;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Extension of cached bundle files
pub const BUNDLE_EXTENSION: &str = "json";

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Cache size status relative to the configured budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSizeStatus {
    /// Under 80% of budget
    Ok,
    /// Between 80% and 100% of budget
    Warning,
    /// Over budget
    Exceeded,
}

impl CacheSizeStatus {
    pub fn from_usage(current_bytes: u64, limit_bytes: u64) -> Self {
        if limit_bytes == 0 {
            return Self::Ok;
        }
        let percent = Self::percentage(current_bytes, limit_bytes);
        if percent > 100.0 {
            Self::Exceeded
        } else if percent >= 80.0 {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    pub fn percentage(current_bytes: u64, limit_bytes: u64) -> f64 {
        if limit_bytes == 0 {
            return 0.0;
        }
        (current_bytes as f64 / limit_bytes as f64) * 100.0
    }
}

/// Disk tier settings
#[derive(Debug, Clone)]
pub struct DiskCacheOptions {
    /// Cache directory, created on first use
    pub dir: PathBuf,
    /// Entry lifetime
    pub ttl: Duration,
    /// Total size budget in bytes
    pub max_size_bytes: u64,
    /// Entries younger than this are exempt from size eviction
    pub eviction_grace: Duration,
    /// When false the tier behaves as permanently empty
    pub enabled: bool,
}

impl DiskCacheOptions {
    /// Defaults: 7 day TTL, 500 MB budget, no grace period
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::days(7),
            max_size_bytes: 500 * 1024 * 1024,
            eviction_grace: Duration::zero(),
            enabled: true,
        }
    }

    /// Settings from the `[disk]` section
    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: ConfigManager::cache_dir(config),
            ttl: clock::secs(config.disk.ttl_secs),
            max_size_bytes: config.disk.max_size_bytes(),
            eviction_grace: clock::secs(config.disk.eviction_grace_secs),
            enabled: config.disk.enabled,
        }
    }
}

/// Outcome of a cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Entries removed for exceeding the TTL
    pub expired: Vec<String>,
    /// Entries removed to get back under the size budget
    pub evicted: Vec<String>,
    pub freed_bytes: u64,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.evicted.len()
    }
}

/// Snapshot of disk tier usage
#[derive(Debug, Clone, Serialize)]
pub struct DiskCacheStats {
    pub enabled: bool,
    pub dir: PathBuf,
    pub entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl DiskCacheStats {
    pub fn size_status(&self) -> CacheSizeStatus {
        CacheSizeStatus::from_usage(self.total_size_bytes, self.max_size_bytes)
    }
}

/// Persistent bundle cache with TTL and size-bounded eviction
pub struct DiskCache {
    options: DiskCacheOptions,
    clock: Arc<dyn Clock>,
    ready: OnceCell<bool>,
    write_lock: Mutex<()>,
}

impl DiskCache {
    pub fn new(options: DiskCacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            options,
            clock,
            ready: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.options.dir
    }

    pub fn options(&self) -> &DiskCacheOptions {
        &self.options
    }

    fn manifest_path(&self) -> PathBuf {
        self.options.dir.join(MANIFEST_FILE)
    }

    fn bundle_path(&self, id: &str) -> PathBuf {
        self.options
            .dir
            .join(format!("{}.{}", id, BUNDLE_EXTENSION))
    }

    /// Whether the tier is active. The first call creates the directory;
    /// if that fails the tier stays disabled for the life of this instance.
    pub async fn is_enabled(&self) -> bool {
        if !self.options.enabled {
            return false;
        }
        *self.ready.get_or_init(|| self.prepare_dir()).await
    }

    async fn prepare_dir(&self) -> bool {
        let dir = &self.options.dir;
        if let Err(e) = fs::create_dir_all(dir).await {
            warn!(
                "Disk cache disabled: cannot create {}: {}",
                dir.display(),
                e
            );
            return false;
        }

        // An existing directory may still be read-only
        let marker = dir.join(format!(".write-check-{}", uuid::Uuid::new_v4().simple()));
        match fs::write(&marker, b"").await {
            Ok(()) => {
                let _ = fs::remove_file(&marker).await;
                debug!("Disk cache ready at {}", dir.display());
                true
            }
            Err(e) => {
                warn!(
                    "Disk cache disabled: {} is not writable: {}",
                    dir.display(),
                    e
                );
                false
            }
        }
    }

    async fn load_manifest(&self) -> DiskCacheManifest {
        DiskCacheManifest::load(&self.manifest_path()).await
    }

    fn is_expired(&self, entry: &DiskCacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.cached_at) > self.options.ttl
    }

    /// Manifest entry that is within TTL and whose file still exists
    async fn fresh_entry(&self, id: &str) -> Option<DiskCacheEntry> {
        if !self.is_enabled().await {
            return None;
        }

        let manifest = self.load_manifest().await;
        let entry = manifest.get(id)?.clone();

        if self.is_expired(&entry, self.clock.now()) {
            debug!(package_id = id, "Disk cache entry expired");
            return None;
        }

        match fs::metadata(&entry.bundle_path).await {
            Ok(meta) if meta.is_file() => Some(entry),
            _ => {
                debug!(
                    package_id = id,
                    "Disk cache entry points at missing file {}",
                    entry.bundle_path.display()
                );
                None
            }
        }
    }

    /// True iff a fresh entry exists, matches `expected_checksum` when
    /// given, and its bundle file is present.
    pub async fn has(&self, id: &str, expected_checksum: Option<&str>) -> bool {
        match self.fresh_entry(id).await {
            Some(entry) => {
                expected_checksum.map_or(true, |expected| checksums_match(&entry.checksum, expected))
            }
            None => false,
        }
    }

    /// Bundle path for a fresh entry
    pub async fn get_path(&self, id: &str) -> Option<PathBuf> {
        self.fresh_entry(id).await.map(|entry| entry.bundle_path)
    }

    /// Raw manifest lookup, no freshness or file checks
    pub async fn get_entry(&self, id: &str) -> Option<DiskCacheEntry> {
        if !self.is_enabled().await {
            return None;
        }
        self.load_manifest().await.get(id).cloned()
    }

    /// All manifest entries, oldest first
    pub async fn entries(&self) -> Vec<DiskCacheEntry> {
        if !self.is_enabled().await {
            return Vec::new();
        }
        let mut entries: Vec<_> = self.load_manifest().await.entries.into_values().collect();
        entries.sort_by(|a, b| {
            a.cached_at
                .cmp(&b.cached_at)
                .then_with(|| a.package_id.cmp(&b.package_id))
        });
        entries
    }

    /// Write a bundle and record it in the manifest.
    ///
    /// Returns the bundle path, or `None` when the tier is disabled or the
    /// bundle was evicted straight away because it alone exceeds the budget.
    pub async fn set(&self, id: &str, code: &str, checksum: &str) -> PackResult<Option<PathBuf>> {
        validate_package_id(id)?;
        if !self.is_enabled().await {
            return Ok(None);
        }

        let _guard = self.write_lock.lock().await;
        let path = self.bundle_path(id);

        write_atomic(&path, code.as_bytes()).await?;

        let mut manifest = self.load_manifest().await;
        let now = self.clock.now();
        manifest.insert(DiskCacheEntry {
            package_id: id.to_string(),
            checksum: checksum.to_string(),
            bundle_path: path.clone(),
            cached_at: now,
            size: code.len() as u64,
        });

        if manifest.total_size > self.options.max_size_bytes {
            let report = self.sweep(&mut manifest, now).await;
            info!(
                "Disk cache over budget, removed {} entries ({})",
                report.removed(),
                format_bytes(report.freed_bytes)
            );
        }

        if let Err(e) = manifest.save(&self.manifest_path()).await {
            // The manifest on disk does not reference it
            remove_best_effort(&path).await;
            return Err(e);
        }

        if manifest.get(id).is_none() {
            warn!(
                package_id = id,
                "Bundle of {} exceeds the disk cache budget and was not kept",
                format_bytes(code.len() as u64)
            );
            return Ok(None);
        }

        debug!(
            package_id = id,
            checksum = short_checksum(checksum),
            "Cached bundle on disk"
        );
        Ok(Some(path))
    }

    /// Remove a bundle file and its manifest entry
    pub async fn delete(&self, id: &str) -> PackResult<bool> {
        if !self.is_enabled().await {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let mut manifest = self.load_manifest().await;

        match manifest.remove(id) {
            Some(entry) => {
                remove_best_effort(&entry.bundle_path).await;
                manifest.save(&self.manifest_path()).await?;
                debug!(package_id = id, "Removed bundle from disk cache");
                Ok(true)
            }
            None => {
                if validate_package_id(id).is_ok() {
                    remove_best_effort(&self.bundle_path(id)).await;
                }
                Ok(false)
            }
        }
    }

    /// Expire old entries, then evict oldest-first until under budget
    pub async fn cleanup(&self) -> PackResult<CleanupReport> {
        if !self.is_enabled().await {
            return Ok(CleanupReport::default());
        }

        let _guard = self.write_lock.lock().await;
        let mut manifest = self.load_manifest().await;
        let report = self.sweep(&mut manifest, self.clock.now()).await;
        manifest.save(&self.manifest_path()).await?;

        if report.removed() > 0 {
            info!(
                "Disk cache cleanup removed {} expired and {} evicted entries ({})",
                report.expired.len(),
                report.evicted.len(),
                format_bytes(report.freed_bytes)
            );
        }
        Ok(report)
    }

    /// Two-phase sweep over an already loaded manifest. Callers hold the
    /// write lock and persist the manifest afterwards.
    async fn sweep(&self, manifest: &mut DiskCacheManifest, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();
        let mut doomed: HashSet<String> = HashSet::new();

        // Phase 1: TTL
        for entry in manifest.entries.values() {
            if self.is_expired(entry, now) {
                report.expired.push(entry.package_id.clone());
                doomed.insert(entry.package_id.clone());
            }
        }

        // Phase 2: size budget, oldest first
        let mut projected: u64 = manifest
            .entries
            .values()
            .filter(|e| !doomed.contains(&e.package_id))
            .map(|e| e.size)
            .sum();

        let mut remaining: Vec<&DiskCacheEntry> = manifest
            .entries
            .values()
            .filter(|e| !doomed.contains(&e.package_id))
            .collect();
        remaining.sort_by(|a, b| {
            a.cached_at
                .cmp(&b.cached_at)
                .then_with(|| a.package_id.cmp(&b.package_id))
        });

        for entry in remaining {
            if projected <= self.options.max_size_bytes {
                break;
            }
            if now.signed_duration_since(entry.cached_at) < self.options.eviction_grace {
                continue;
            }
            projected = projected.saturating_sub(entry.size);
            report.evicted.push(entry.package_id.clone());
        }
        doomed.extend(report.evicted.iter().cloned());

        for id in &doomed {
            if let Some(entry) = manifest.remove(id) {
                remove_best_effort(&entry.bundle_path).await;
                report.freed_bytes += entry.size;
            }
        }

        manifest.last_cleanup = Some(now);
        report
    }

    /// Delete every bundle and reset the manifest
    pub async fn clear(&self) -> PackResult<()> {
        if !self.is_enabled().await {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let manifest = self.load_manifest().await;
        for entry in manifest.entries.values() {
            remove_best_effort(&entry.bundle_path).await;
        }

        // Bundles orphaned by an earlier lost manifest update
        let mut dir = fs::read_dir(&self.options.dir)
            .await
            .map_err(|e| PackError::io("reading disk cache directory", e))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PackError::io("reading disk cache entry", e))?
        {
            let path = entry.path();
            let is_bundle = path.extension().is_some_and(|ext| ext == BUNDLE_EXTENSION)
                && path.file_name().is_some_and(|name| name != MANIFEST_FILE);
            if is_bundle {
                remove_best_effort(&path).await;
            }
        }

        DiskCacheManifest::default()
            .save(&self.manifest_path())
            .await?;
        info!("Cleared disk cache at {}", self.options.dir.display());
        Ok(())
    }

    /// Usage snapshot
    pub async fn stats(&self) -> DiskCacheStats {
        let enabled = self.is_enabled().await;
        let manifest = if enabled {
            self.load_manifest().await
        } else {
            DiskCacheManifest::default()
        };

        DiskCacheStats {
            enabled,
            dir: self.options.dir.clone(),
            entries: manifest.len(),
            total_size_bytes: manifest.total_size,
            max_size_bytes: self.options.max_size_bytes,
            last_cleanup: manifest.last_cleanup,
        }
    }
}

/// Write through a sibling temp file and rename into place
async fn write_atomic(path: &Path, data: &[u8]) -> PackResult<()> {
    let tmp_path = path.with_extension(format!(
        "{}.{}.tmp",
        BUNDLE_EXTENSION,
        uuid::Uuid::new_v4().simple()
    ));

    fs::write(&tmp_path, data)
        .await
        .map_err(|e| PackError::io(format!("writing bundle {}", tmp_path.display()), e))?;

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(PackError::io(
            format!("moving bundle into place at {}", path.display()),
            e,
        ));
    }
    Ok(())
}

/// Delete a file, ignoring missing files and logging anything else
async fn remove_best_effort(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Failed to remove {}: {}", path.display(), e),
    }
}
