//! Disk cache manifest
//!
//! `manifest.json` is the single source of truth for disk-cache state. It
//! records every cached bundle with its checksum, path, size and age, and
//! the running total of all sizes. Writes go through a temp file and a
//! rename so a crash never leaves a half-written manifest behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{PackError, PackResult};

/// Manifest file name inside the cache directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest schema version
pub const MANIFEST_VERSION: u32 = 1;

/// One cached bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskCacheEntry {
    pub package_id: String,
    pub checksum: String,
    pub bundle_path: PathBuf,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub cached_at: DateTime<Utc>,
    pub size: u64,
}

/// Index of all disk-cached bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskCacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, DiskCacheEntry>,
    pub total_size: u64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl Default for DiskCacheManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
            total_size: 0,
            last_cleanup: None,
        }
    }
}

impl DiskCacheManifest {
    /// Read the manifest, falling back to an empty one if it is absent,
    /// unreadable, corrupt or from another schema version.
    pub async fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read manifest {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Corrupt manifest {}, starting empty: {}", path.display(), e);
                return Self::default();
            }
        };

        if manifest.version != MANIFEST_VERSION {
            warn!(
                "Manifest version {} is not supported (expected {}), starting empty",
                manifest.version, MANIFEST_VERSION
            );
            return Self::default();
        }

        if !manifest.is_consistent() {
            warn!(
                "Manifest total size {} does not match its entries, recomputing",
                manifest.total_size
            );
            manifest.recompute_total();
        }

        manifest
    }

    /// Persist atomically: write a sibling temp file, then rename over `path`
    pub async fn save(&self, path: &Path) -> PackResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| PackError::io(format!("writing manifest {}", tmp_path.display()), e))?;

        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PackError::io(
                format!("replacing manifest {}", path.display()),
                e,
            ));
        }

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DiskCacheEntry> {
        self.entries.get(id)
    }

    /// Insert or replace an entry, keeping `total_size` in sync.
    /// Returns the replaced entry.
    pub fn insert(&mut self, entry: DiskCacheEntry) -> Option<DiskCacheEntry> {
        self.total_size = self.total_size.saturating_add(entry.size);
        let replaced = self.entries.insert(entry.package_id.clone(), entry);
        if let Some(ref old) = replaced {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        replaced
    }

    /// Remove an entry, keeping `total_size` in sync
    pub fn remove(&mut self, id: &str) -> Option<DiskCacheEntry> {
        let removed = self.entries.remove(id)?;
        self.total_size = self.total_size.saturating_sub(removed.size);
        Some(removed)
    }

    /// Sum of all entry sizes
    pub fn entries_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }

    /// Whether `total_size` equals the sum of the entries
    pub fn is_consistent(&self) -> bool {
        self.total_size == self.entries_size()
    }

    pub fn recompute_total(&mut self) {
        self.total_size = self.entries_size();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, size: u64) -> DiskCacheEntry {
        DiskCacheEntry {
            package_id: id.to_string(),
            checksum: format!("sum-{}", id),
            bundle_path: PathBuf::from(format!("/cache/{}.json", id)),
            cached_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            size,
        }
    }

    #[test]
    fn insert_replaces_without_double_counting() {
        let mut manifest = DiskCacheManifest::default();
        manifest.insert(entry("a", 100));
        manifest.insert(entry("b", 50));
        let replaced = manifest.insert(entry("a", 70));

        assert_eq!(replaced.unwrap().size, 100);
        assert_eq!(manifest.total_size, 120);
        assert!(manifest.is_consistent());
    }

    #[test]
    fn remove_decrements_total() {
        let mut manifest = DiskCacheManifest::default();
        manifest.insert(entry("a", 100));
        manifest.insert(entry("b", 50));

        assert!(manifest.remove("a").is_some());
        assert!(manifest.remove("a").is_none());
        assert_eq!(manifest.total_size, 50);
    }

    #[test]
    fn serialized_shape() {
        let mut manifest = DiskCacheManifest::default();
        manifest.insert(entry("a", 10));

        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["totalSize"], 10);
        assert!(json["lastCleanup"].is_null());
        assert_eq!(json["entries"]["a"]["packageId"], "a");
        assert_eq!(json["entries"]["a"]["cachedAt"], 1_700_000_000_000i64);
        assert_eq!(json["entries"]["a"]["bundlePath"], "/cache/a.json");
    }

    #[tokio::test]
    async fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);

        let mut manifest = DiskCacheManifest::default();
        manifest.insert(entry("a", 10));
        manifest.last_cleanup = DateTime::from_timestamp_millis(1_700_000_500_000);
        manifest.save(&path).await.unwrap();

        let loaded = DiskCacheManifest::load(&path).await;
        assert_eq!(loaded, manifest);

        // No temp files left behind
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn missing_manifest_loads_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = DiskCacheManifest::load(&dir.path().join(MANIFEST_FILE)).await;
        assert!(manifest.is_empty());
        assert_eq!(manifest.total_size, 0);
    }

    #[tokio::test]
    async fn corrupt_manifest_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let manifest = DiskCacheManifest::load(&path).await;
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn inconsistent_total_is_recomputed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);

        let mut manifest = DiskCacheManifest::default();
        manifest.insert(entry("a", 10));
        manifest.insert(entry("b", 5));
        manifest.total_size = 999;
        manifest.save(&path).await.unwrap();

        let loaded = DiskCacheManifest::load(&path).await;
        assert_eq!(loaded.total_size, 15);
    }
}
