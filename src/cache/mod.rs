//! Package cache tiers
//!
//! Two local tiers sit in front of remote object storage:
//!
//! | Tier | Lifetime | Validated by |
//! |------|----------|--------------|
//! | Memory | 30 min TTL, lost on restart | checksum recorded at insert |
//! | Disk | 7 day TTL, 500 MB budget | manifest checksum + file presence |
//!
//! Both tiers return misses (`None`/`false`) for expected conditions such
//! as expired entries or missing files; they never fail a resolution.

pub mod disk;
pub mod manifest;
pub mod memory;

pub use disk::{
    format_bytes, CacheSizeStatus, CleanupReport, DiskCache, DiskCacheOptions, DiskCacheStats,
};
pub use manifest::{DiskCacheEntry, DiskCacheManifest};
pub use memory::{CachedPackage, MemoryCache};
