//! Loader statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

/// Process-wide load counters, reset only by an explicit call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStats {
    pub memory_cache_hits: u64,
    pub memory_cache_misses: u64,
    pub disk_cache_hits: u64,
    pub disk_cache_misses: u64,
    pub remote_loads: u64,
    pub errors: u64,
    /// Mean duration of loads served by the disk or remote tier
    pub average_load_time_ms: f64,
}

#[derive(Debug, Default)]
struct Counters {
    stats: LoaderStats,
    timed_loads: u64,
    total_load_time: Duration,
}

/// Thread-safe accumulator behind `LoaderStats`
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    counters: Mutex<Counters>,
}

impl StatsRecorder {
    pub fn memory_hit(&self) {
        self.counters.lock().stats.memory_cache_hits += 1;
    }

    pub fn memory_miss(&self) {
        self.counters.lock().stats.memory_cache_misses += 1;
    }

    pub fn disk_hit(&self) {
        self.counters.lock().stats.disk_cache_hits += 1;
    }

    pub fn disk_miss(&self) {
        self.counters.lock().stats.disk_cache_misses += 1;
    }

    pub fn remote_load(&self) {
        self.counters.lock().stats.remote_loads += 1;
    }

    pub fn error(&self) {
        self.counters.lock().stats.errors += 1;
    }

    pub fn load_time(&self, elapsed: Duration) {
        let mut counters = self.counters.lock();
        counters.timed_loads += 1;
        counters.total_load_time += elapsed;
        counters.stats.average_load_time_ms =
            counters.total_load_time.as_secs_f64() * 1000.0 / counters.timed_loads as f64;
    }

    pub fn snapshot(&self) -> LoaderStats {
        self.counters.lock().stats.clone()
    }

    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }
}
