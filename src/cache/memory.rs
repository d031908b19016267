//! In-memory package cache
//!
//! Fastest tier. Entries expire lazily: an expired entry is removed by the
//! read that notices it. Contents are lost on process restart.

use crate::clock::Clock;
use crate::package::SharedPackage;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default lifetime of a memory entry
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 30 * 60;

/// A cached package together with the checksum it was loaded from
#[derive(Debug, Clone)]
pub struct CachedPackage {
    pub package: SharedPackage,
    pub checksum: String,
}

#[derive(Debug, Clone)]
struct MemoryCacheEntry {
    package: SharedPackage,
    checksum: String,
    inserted_at: DateTime<Utc>,
}

/// Bounded-lifetime map from package id to loaded package
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryCacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Create a memory cache with the given entry lifetime
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Get a fresh package, dropping it if expired
    pub fn get(&self, id: &str) -> Option<SharedPackage> {
        self.get_with_checksum(id).map(|cached| cached.package)
    }

    /// Get a fresh package and the checksum it was cached with
    pub fn get_with_checksum(&self, id: &str) -> Option<CachedPackage> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries.get(id)?;
        if now.signed_duration_since(entry.inserted_at) > self.ttl {
            debug!(package_id = id, "Memory cache entry expired");
            entries.remove(id);
            return None;
        }

        Some(CachedPackage {
            package: Arc::clone(&entry.package),
            checksum: entry.checksum.clone(),
        })
    }

    /// Insert or overwrite an entry, resetting its insertion time
    pub fn set(&self, id: &str, package: SharedPackage, checksum: &str) {
        let entry = MemoryCacheEntry {
            package,
            checksum: checksum.to_string(),
            inserted_at: self.clock.now(),
        };
        self.entries.lock().insert(id.to_string(), entry);
    }

    /// Remove an entry, returning whether it existed
    pub fn delete(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries, including ones that expired but were not read yet
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached ids, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::package::{DeclarativePackage, PackageDefinition};

    fn package(name: &str) -> SharedPackage {
        let source = format!(
            r#"{{"kind": "declarative", "name": "{}", "version": "1.0.0",
                "agents": [{{"id": "a", "name": "A", "type": "chat"}}]}}"#,
            name
        );
        Arc::new(DeclarativePackage::new(
            PackageDefinition::parse(name, &source).unwrap(),
        ))
    }

    fn cache() -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::new(Duration::minutes(30), clock.clone());
        (cache, clock)
    }

    #[test]
    fn set_and_get() {
        let (cache, _clock) = cache();
        cache.set("pkg", package("pkg"), "abc123");

        let cached = cache.get_with_checksum("pkg").unwrap();
        assert_eq!(cached.checksum, "abc123");
        assert_eq!(cached.package.metadata().name, "pkg");
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn entry_fresh_at_exact_ttl() {
        let (cache, clock) = cache();
        cache.set("pkg", package("pkg"), "abc123");

        clock.advance(Duration::minutes(30));
        assert!(cache.get("pkg").is_some());
    }

    #[test]
    fn expired_entry_removed_on_read() {
        let (cache, clock) = cache();
        cache.set("pkg", package("pkg"), "abc123");

        clock.advance(Duration::minutes(30) + Duration::milliseconds(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("pkg").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_resets_insertion_clock() {
        let (cache, clock) = cache();
        cache.set("pkg", package("pkg"), "v1");

        clock.advance(Duration::minutes(20));
        cache.set("pkg", package("pkg"), "v2");
        clock.advance(Duration::minutes(20));

        let cached = cache.get_with_checksum("pkg").unwrap();
        assert_eq!(cached.checksum, "v2");
    }

    #[test]
    fn delete_clear_and_keys() {
        let (cache, _clock) = cache();
        cache.set("b", package("b"), "1");
        cache.set("a", package("a"), "2");

        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
