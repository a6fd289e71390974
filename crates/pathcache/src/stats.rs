//! Cache activity counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters shared by every caller of a cache
///
/// Updated with relaxed atomics; read them through [`snapshot`](Self::snapshot)
/// when several values need to be compared.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    removals: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups that found a value
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Values stored, overwrites included
    pub inserts: u64,
    /// Values dropped to stay under capacity
    pub evictions: u64,
    /// Values dropped by `remove` or `remove_prefix`
    pub removals: u64,
}

impl StatsSnapshot {
    /// Hits plus misses
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups that hit, 0.0 when nothing was looked up
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup that found a value
    pub fn record_hit(&self) {
        bump(&self.hits, 1);
    }

    /// Record a lookup that found nothing
    pub fn record_miss(&self) {
        bump(&self.misses, 1);
    }

    /// Record a stored value
    pub fn record_insert(&self) {
        bump(&self.inserts, 1);
    }

    /// Record `count` values dropped by eviction
    pub fn record_evictions(&self, count: u64) {
        bump(&self.evictions, count);
    }

    /// Record `count` values dropped by explicit removal
    pub fn record_removals(&self, count: u64) {
        bump(&self.removals, count);
    }

    /// Copy every counter at once
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            inserts: self.inserts(),
            evictions: self.evictions(),
            removals: self.removals(),
        }
    }

    /// Total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total inserts, overwrites included
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Total values evicted
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Total values removed explicitly
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    /// Share of lookups that hit
    pub fn hit_ratio(&self) -> f64 {
        self.snapshot().hit_ratio()
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.evictions,
            &self.removals,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn bump(counter: &AtomicU64, count: u64) {
    if count > 0 {
        counter.fetch_add(count, Ordering::Relaxed);
    }
}
