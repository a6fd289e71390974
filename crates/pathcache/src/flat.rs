//! FlatCache: single-level alternative keyed by the whole path

use parking_lot::RwLock;
use pathtree::{Error, PathKey, Result};
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::lru::LruCache;
use crate::stats::CacheStats;

/// Bounded cache keyed by complete paths
///
/// Each entry is stored under its full segment list in a plain LRU map.
/// Eviction is by global recency only and ignores path grouping; prefix
/// queries scan every live key. Cheaper to reason about than
/// [`HierarchicalCache`](crate::HierarchicalCache) but it can drop the
/// newest member of an otherwise active branch.
pub struct FlatCache<V> {
    entries: RwLock<LruCache<PathKey, V>>,
    stats: CacheStats,
    config: CacheConfig,
}

impl<V> FlatCache<V> {
    /// Create a cache holding at most `max_entries` values
    pub fn new(max_entries: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(max_entries))
    }

    /// Create a cache from a full configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            entries: RwLock::new(LruCache::new(config.max_entries)),
            stats: CacheStats::new(),
            config,
        })
    }

    /// Store `value` under `path`, evicting the least recent entry if full
    pub fn put(&self, path: impl Into<PathKey>, value: V) -> Result<()> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut entries = self.entries.write();
        debug!(path = %path, "flat cache put");
        if let Some((evicted, _)) = entries.put(path, value) {
            self.stats.record_evictions(1);
            debug!(path = %evicted, "evicted entry");
        }
        self.stats.record_insert();
        Ok(())
    }

    /// Clone of the value stored under `path`
    pub fn get(&self, path: impl Into<PathKey>) -> Result<V>
    where
        V: Clone,
    {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let found = if self.config.refresh_on_read {
            self.entries.write().get(&path).cloned()
        } else {
            self.entries.read().peek(&path).cloned()
        };

        match found {
            Some(value) => {
                self.stats.record_hit();
                Ok(value)
            }
            None => {
                self.stats.record_miss();
                trace!(path = %path, "cache miss");
                Err(Error::NotFound { path })
            }
        }
    }

    /// True if a value is stored under `path`
    pub fn contains(&self, path: impl Into<PathKey>) -> bool {
        self.entries.read().contains(&path.into())
    }

    /// Values whose path extends `prefix` by at least one segment
    ///
    /// Sorted by path so the result does not depend on recency order.
    pub fn children_matching(&self, prefix: impl Into<PathKey>) -> Vec<V>
    where
        V: Clone,
    {
        let prefix = prefix.into();
        let entries = self.entries.read();

        let mut matches: Vec<(&PathKey, &V)> = entries
            .iter()
            .filter(|(path, _)| path.len() > prefix.len() && path.starts_with(&prefix))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches.into_iter().map(|(_, value)| value.clone()).collect()
    }

    /// Remove the value stored under `path`; a missing path is a no-op
    pub fn remove(&self, path: impl Into<PathKey>) -> Result<Option<V>> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let removed = self.entries.write().remove(&path);
        if removed.is_some() {
            self.stats.record_removals(1);
        }
        Ok(removed)
    }

    /// Remove `path` and every entry below it
    pub fn remove_prefix(&self, path: impl Into<PathKey>) -> Result<usize> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut entries = self.entries.write();
        let doomed: Vec<PathKey> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(&path))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.remove(key);
        }

        self.stats.record_removals(doomed.len() as u64);
        debug!(path = %path, dropped = doomed.len(), "flat cache remove prefix");
        Ok(doomed.len())
    }

    /// Number of stored values
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    /// True if no values are stored
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Maximum number of stored values
    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.entries.write().clear();
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_eviction_is_global_recency() {
        let cache = FlatCache::new(2).unwrap();

        cache.put(["owner", "a"], 1).unwrap();
        cache.put(["other"], 2).unwrap();
        cache.put(["owner", "b"], 3).unwrap();

        // Pure recency: the oldest key goes even though its branch is active
        assert!(!cache.contains(["owner", "a"]));
        assert_eq!(cache.get(["other"]).unwrap(), 2);
        assert_eq!(cache.get(["owner", "b"]).unwrap(), 3);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_flat_children_matching_whole_segments() {
        let cache = FlatCache::new(10).unwrap();

        cache.put(["owner", "repo2"], "R2").unwrap();
        cache.put(["owner", "repo1"], "R1").unwrap();
        cache.put(["owner"], "O").unwrap();
        cache.put(["ownership"], "X").unwrap();

        assert_eq!(cache.children_matching(["owner"]), vec!["R1", "R2"]);
    }

    #[test]
    fn test_flat_refresh_on_read() {
        let config = CacheConfig::new(2).with_refresh_on_read(true);
        let cache = FlatCache::with_config(config).unwrap();

        cache.put(["a"], 1).unwrap();
        cache.put(["b"], 2).unwrap();
        cache.get(["a"]).unwrap();
        cache.put(["c"], 3).unwrap();

        assert!(cache.contains(["a"]));
        assert!(!cache.contains(["b"]));
    }

    #[test]
    fn test_flat_remove() {
        let cache = FlatCache::new(10).unwrap();

        cache.put(["a"], 1).unwrap();

        assert_eq!(cache.remove(["a"]).unwrap(), Some(1));
        assert_eq!(cache.remove(["a"]).unwrap(), None);
        assert!(cache.get(["a"]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_flat_remove_prefix() {
        let cache = FlatCache::new(10).unwrap();

        cache.put(["owner"], 0).unwrap();
        cache.put(["owner", "a"], 1).unwrap();
        cache.put(["owner", "b"], 2).unwrap();
        cache.put(["ownership"], 3).unwrap();

        assert_eq!(cache.remove_prefix(["owner"]).unwrap(), 3);
        assert_eq!(cache.size(), 1);
        assert!(cache.contains(["ownership"]));
    }

    #[test]
    fn test_flat_empty_path() {
        let cache = FlatCache::<i32>::new(10).unwrap();

        assert_eq!(cache.put(PathKey::default(), 1), Err(Error::EmptyPath));
        assert!(cache.is_empty());
    }
}
