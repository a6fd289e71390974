//! HierarchicalCache: path-keyed cache with leaf-aware eviction

use parking_lot::RwLock;
use pathtree::{Error, NodeId, PathKey, PathTree, Result};
use tracing::{debug, error, trace};

use crate::config::CacheConfig;
use crate::stats::CacheStats;

/// Bounded cache whose keys are paths of string segments
///
/// Values sit on nodes of a [`PathTree`]. When a `put` pushes the number of
/// stored values past `max_entries`, the cache repeatedly removes the
/// oldest *leaf*: starting at the root it follows the least recently
/// written child at every level. A recently written branch is therefore
/// never dropped just because it hangs off an old top-level segment.
///
/// Every method takes `&self` and holds the internal lock for its whole
/// duration, so the cache can be shared between tasks behind an `Arc`.
pub struct HierarchicalCache<V> {
    /// Path-segment tree holding the values
    tree: RwLock<PathTree<V>>,

    /// Cache statistics
    stats: CacheStats,

    /// Fixed at construction
    config: CacheConfig,
}

impl<V> Default for HierarchicalCache<V> {
    fn default() -> Self {
        Self {
            tree: RwLock::new(PathTree::new()),
            stats: CacheStats::new(),
            config: CacheConfig::default(),
        }
    }
}

impl<V> HierarchicalCache<V> {
    /// Create a cache holding at most `max_entries` values
    pub fn new(max_entries: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(max_entries))
    }

    /// Create a cache from a full configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tree: RwLock::new(PathTree::new()),
            stats: CacheStats::new(),
            config,
        })
    }

    /// Store `value` at `path`, evicting old leaves if over capacity
    ///
    /// Missing intermediate segments are created without values. Returns
    /// the handle of the node written. When the written node is the only
    /// path below an older branch, the eviction this put triggers can pick
    /// it, in which case the returned handle is already stale.
    pub fn put(&self, path: impl Into<PathKey>, value: V) -> Result<NodeId> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut tree = self.tree.write();
        let node = tree.resolve_or_create(&path)?;
        tree.set_value(node, value)?;
        self.stats.record_insert();
        debug!(path = %path, size = tree.size(), "cache put");

        self.evict(&mut tree)?;
        Ok(node)
    }

    /// Clone of the value stored at `path`
    ///
    /// Fails with [`Error::NotFound`] if a segment is missing or the node
    /// holds no value. Only refreshes recency when the cache was built with
    /// `refresh_on_read`.
    pub fn get(&self, path: impl Into<PathKey>) -> Result<V>
    where
        V: Clone,
    {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let found = if self.config.refresh_on_read {
            let mut tree = self.tree.write();
            match lookup(&tree, &path) {
                Some((node, value)) => {
                    tree.touch(node)?;
                    Some(value)
                }
                None => None,
            }
        } else {
            lookup(&self.tree.read(), &path).map(|(_, value)| value)
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

    /// Clone of the value on a node returned by [`put`](Self::put)
    ///
    /// Fails with [`Error::StaleNode`] once the node has been evicted or
    /// removed, and with [`Error::NotFound`] if it is still present but
    /// its value was voided.
    pub fn get_by_handle(&self, node: NodeId) -> Result<V>
    where
        V: Clone,
    {
        let tree = self.tree.read();
        match tree.value(node)? {
            Some(value) => Ok(value.clone()),
            None => Err(Error::NotFound {
                path: tree.path_of(node)?,
            }),
        }
    }

    /// True if a value is stored at `path`
    pub fn contains(&self, path: impl Into<PathKey>) -> bool {
        let path = path.into();
        if path.is_empty() {
            return false;
        }

        let tree = self.tree.read();
        tree.resolve(&path)
            .is_some_and(|node| matches!(tree.value(node), Ok(Some(_))))
    }

    /// Values stored anywhere below `prefix`
    ///
    /// The prefix node's own value is not included. Order is pre-order with
    /// siblings sorted by segment. A missing prefix yields an empty list;
    /// an empty prefix yields every value in the cache.
    pub fn children_matching(&self, prefix: impl Into<PathKey>) -> Result<Vec<V>>
    where
        V: Clone,
    {
        let prefix = prefix.into();
        let tree = self.tree.read();

        let Some(node) = tree.resolve(&prefix) else {
            return Ok(Vec::new());
        };

        Ok(tree
            .descendant_values(node)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Remove the value stored at `path`
    ///
    /// A childless node is detached; a node with children stays behind as
    /// a valueless container. Parents are never pruned. Removing a path
    /// that holds nothing is a no-op returning `Ok(None)`.
    pub fn remove(&self, path: impl Into<PathKey>) -> Result<Option<V>> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut tree = self.tree.write();
        let Some(node) = tree.resolve(&path) else {
            trace!(path = %path, "remove of missing path");
            return Ok(None);
        };

        let removed = if tree.child_count(node)? == 0 {
            tree.detach_leaf(node)?
        } else {
            tree.take_value(node)?
        };

        if removed.is_some() {
            self.stats.record_removals(1);
            debug!(path = %path, size = tree.size(), "cache remove");
        }
        Ok(removed)
    }

    /// Remove `path` and everything below it
    ///
    /// Returns the number of values dropped; a missing path drops nothing.
    pub fn remove_prefix(&self, path: impl Into<PathKey>) -> Result<usize> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut tree = self.tree.write();
        let Some(node) = tree.resolve(&path) else {
            return Ok(0);
        };

        let dropped = tree.detach_subtree(node)?;
        self.stats.record_removals(dropped as u64);
        debug!(path = %path, dropped, size = tree.size(), "cache remove prefix");
        Ok(dropped)
    }

    /// Paths of every stored value, pre-order
    pub fn keys(&self) -> Result<Vec<PathKey>> {
        let tree = self.tree.read();
        Ok(tree.entries()?.into_iter().map(|(path, _)| path).collect())
    }

    /// Number of stored values
    pub fn size(&self) -> usize {
        self.tree.read().size()
    }

    /// True if no values are stored
    pub fn is_empty(&self) -> bool {
        self.tree.read().is_empty()
    }

    /// Number of tree nodes, valueless containers included
    pub fn node_count(&self) -> usize {
        self.tree.read().node_count()
    }

    /// Maximum number of stored values
    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    /// Configuration the cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.tree.write().clear();
        self.stats.reset();
    }

    fn evict(&self, tree: &mut PathTree<V>) -> Result<()> {
        let mut evicted = 0u64;

        while tree.size() > self.config.max_entries {
            let root = tree.root();
            let leaf = tree.oldest_leaf_under(root)?;
            if leaf == root {
                error!(
                    size = tree.size(),
                    max_entries = self.config.max_entries,
                    "no leaf left to evict"
                );
                return Err(Error::CapacityInvariant {
                    size: tree.size(),
                    max_entries: self.config.max_entries,
                });
            }

            let path = tree.path_of(leaf)?;
            match tree.detach_leaf(leaf)? {
                Some(_) => {
                    evicted += 1;
                    debug!(path = %path, "evicted entry");
                }
                None => trace!(path = %path, "dropped empty container"),
            }
        }

        self.stats.record_evictions(evicted);
        Ok(())
    }
}

fn lookup<V: Clone>(tree: &PathTree<V>, path: &PathKey) -> Option<(NodeId, V)> {
    let node = tree.resolve(path)?;
    let value = tree.value(node).ok()??.clone();
    Some((node, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner", "repo"], 1).unwrap();

        assert_eq!(cache.get(["owner", "repo"]).unwrap(), 1);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().inserts(), 1);
    }

    #[test]
    fn test_cache_single_string_path() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put("owner", 1).unwrap();

        assert_eq!(cache.get(["owner"]).unwrap(), 1);
    }

    #[test]
    fn test_cache_default_capacity() {
        let cache = HierarchicalCache::<u8>::default();
        assert_eq!(cache.capacity(), 100);
    }

    #[test]
    fn test_cache_rejects_zero_capacity() {
        let result = HierarchicalCache::<u8>::new(0);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_cache_eviction_order() {
        let cache = HierarchicalCache::new(2).unwrap();

        cache.put(["a"], 1).unwrap();
        cache.put(["b"], 2).unwrap();
        cache.put(["c"], 3).unwrap();

        assert_eq!(cache.size(), 2);
        assert!(cache.get(["a"]).unwrap_err().is_not_found());
        assert_eq!(cache.get(["b"]).unwrap(), 2);
        assert_eq!(cache.get(["c"]).unwrap(), 3);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_cache_eviction_descends_to_leaf() {
        let cache = HierarchicalCache::new(3).unwrap();

        cache.put(["owner", "old"], 1).unwrap();
        cache.put(["other"], 2).unwrap();
        cache.put(["owner", "new"], 3).unwrap();
        cache.put(["third"], 4).unwrap();

        // "other" is the oldest top-level branch once "owner" was rewritten
        assert!(!cache.contains(["other"]));
        assert!(cache.contains(["owner", "old"]));
        assert!(cache.contains(["owner", "new"]));
        assert!(cache.contains(["third"]));
    }

    #[test]
    fn test_cache_eviction_leaves_empty_parent() {
        let cache = HierarchicalCache::new(1).unwrap();

        cache.put(["owner", "repo"], 1).unwrap();
        cache.put(["other"], 2).unwrap();

        assert_eq!(cache.size(), 1);
        assert!(!cache.contains(["owner", "repo"]));
        // "owner" stays behind as an empty container
        assert_eq!(cache.node_count(), 2);
    }

    #[test]
    fn test_cache_eviction_drops_empty_containers_first_when_oldest() {
        let cache = HierarchicalCache::new(1).unwrap();

        cache.put(["owner", "repo"], 1).unwrap();
        cache.put(["other"], 2).unwrap();
        cache.put(["third"], 3).unwrap();

        // The stale "owner" container is the oldest leaf and goes first,
        // then "other" is evicted to get back under capacity
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get(["third"]).unwrap(), 3);
        assert_eq!(cache.node_count(), 1);
        assert_eq!(cache.stats().evictions(), 2);
    }

    #[test]
    fn test_cache_reput_refreshes() {
        let cache = HierarchicalCache::new(2).unwrap();

        cache.put(["a"], 1).unwrap();
        cache.put(["b"], 2).unwrap();
        cache.put(["a"], 10).unwrap();
        cache.put(["c"], 3).unwrap();

        assert_eq!(cache.get(["a"]).unwrap(), 10);
        assert!(!cache.contains(["b"]));
        assert_eq!(cache.get(["c"]).unwrap(), 3);
    }

    #[test]
    fn test_cache_get_does_not_refresh_by_default() {
        let cache = HierarchicalCache::new(2).unwrap();

        cache.put(["a"], 1).unwrap();
        cache.put(["b"], 2).unwrap();
        cache.get(["a"]).unwrap();
        cache.put(["c"], 3).unwrap();

        assert!(!cache.contains(["a"]));
        assert!(cache.contains(["b"]));
    }

    #[test]
    fn test_cache_get_refreshes_when_configured() {
        let config = CacheConfig::new(2).with_refresh_on_read(true);
        let cache = HierarchicalCache::with_config(config).unwrap();

        cache.put(["a"], 1).unwrap();
        cache.put(["b"], 2).unwrap();
        cache.get(["a"]).unwrap();
        cache.put(["c"], 3).unwrap();

        assert!(cache.contains(["a"]));
        assert!(!cache.contains(["b"]));
    }

    #[test]
    fn test_cache_missing_intermediate() {
        let cache = HierarchicalCache::<i32>::new(10).unwrap();

        let err = cache.get(["x", "y"]).unwrap_err();
        assert_eq!(
            err,
            Error::NotFound {
                path: PathKey::from(["x", "y"])
            }
        );
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_cache_valueless_intermediate_is_miss() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner", "repo"], 1).unwrap();

        assert!(cache.get(["owner"]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_cache_empty_path() {
        let cache = HierarchicalCache::new(10).unwrap();

        assert_eq!(cache.put(PathKey::default(), 1), Err(Error::EmptyPath));
        assert_eq!(cache.get(PathKey::default()), Err(Error::EmptyPath));
        assert_eq!(cache.remove(PathKey::default()), Err(Error::EmptyPath));
        assert_eq!(cache.node_count(), 0);
        assert_eq!(cache.stats().inserts(), 0);
    }

    #[test]
    fn test_cache_children_matching() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner", "repo1"], "R1").unwrap();
        cache.put(["owner", "repo2"], "R2").unwrap();
        cache.put(["owner", "repo2", "tag"], "T").unwrap();
        cache.put(["elsewhere"], "E").unwrap();

        assert_eq!(
            cache.children_matching(["owner"]).unwrap(),
            vec!["R1", "R2", "T"]
        );
        assert_eq!(cache.children_matching(["owner", "repo2"]).unwrap(), vec!["T"]);
        assert!(cache.children_matching(["missing"]).unwrap().is_empty());
        assert_eq!(cache.children_matching(PathKey::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_cache_remove_leaf() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner", "repo"], 1).unwrap();

        assert_eq!(cache.remove(["owner", "repo"]).unwrap(), Some(1));
        assert!(cache.get(["owner", "repo"]).unwrap_err().is_not_found());
        assert_eq!(cache.size(), 0);
        // Parent is not pruned
        assert_eq!(cache.node_count(), 1);
        assert_eq!(cache.stats().removals(), 1);
    }

    #[test]
    fn test_cache_remove_interior_keeps_children() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner"], 0).unwrap();
        cache.put(["owner", "repo"], 1).unwrap();

        assert_eq!(cache.remove(["owner"]).unwrap(), Some(0));
        assert!(!cache.contains(["owner"]));
        assert_eq!(cache.get(["owner", "repo"]).unwrap(), 1);
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_cache_remove_missing_is_noop() {
        let cache = HierarchicalCache::<i32>::new(10).unwrap();

        assert_eq!(cache.remove(["nothing", "here"]).unwrap(), None);
        assert_eq!(cache.stats().removals(), 0);
    }

    #[test]
    fn test_cache_remove_prefix() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["owner", "repo1"], 1).unwrap();
        cache.put(["owner", "repo2"], 2).unwrap();
        cache.put(["other"], 3).unwrap();

        assert_eq!(cache.remove_prefix(["owner"]).unwrap(), 2);
        assert_eq!(cache.remove_prefix(["owner"]).unwrap(), 0);
        assert_eq!(cache.keys().unwrap(), vec![PathKey::from("other")]);
    }

    #[test]
    fn test_cache_get_by_handle() {
        let cache = HierarchicalCache::new(1).unwrap();

        let a = cache.put(["a"], 1).unwrap();
        assert_eq!(cache.get_by_handle(a).unwrap(), 1);

        cache.put(["b"], 2).unwrap();
        assert_eq!(cache.get_by_handle(a), Err(Error::StaleNode));
    }

    #[test]
    fn test_cache_handle_stale_after_clear() {
        let cache = HierarchicalCache::new(10).unwrap();

        let old = cache.put(["a", "b"], 1).unwrap();
        cache.clear();
        let new = cache.put(["x", "y"], 99).unwrap();

        assert_eq!(cache.get_by_handle(old), Err(Error::StaleNode));
        assert_eq!(cache.get_by_handle(new).unwrap(), 99);
    }

    #[test]
    fn test_cache_put_below_only_leaf_evicts_new_node() {
        let cache = HierarchicalCache::new(1).unwrap();

        cache.put(["a", "x"], 1).unwrap();
        let deep = cache.put(["a", "x", "deep"], 2).unwrap();

        // "deep" is the only leaf under the single branch, so it is the victim
        assert!(cache.get(["a", "x", "deep"]).unwrap_err().is_not_found());
        assert_eq!(cache.get(["a", "x"]).unwrap(), 1);
        assert_eq!(cache.get_by_handle(deep), Err(Error::StaleNode));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let cache = HierarchicalCache::new(10).unwrap();

        cache.put(["a", "b"], 1).unwrap();
        cache.put(["c"], 2).unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.node_count(), 0);
        assert_eq!(cache.stats().inserts(), 0);
    }
}
