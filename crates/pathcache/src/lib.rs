//! # pathcache
//!
//! Bounded in-memory caches keyed by paths of string segments, such as
//! `owner -> repository -> name`.
//!
//! ## Architecture
//! - **HierarchicalCache**: values on a [`PathTree`]; eviction walks down
//!   to the least recently written leaf so active branches survive
//! - **FlatCache**: whole path as one key in an LRU map (AHash + intrusive
//!   list); pure global recency, prefix queries by linear scan
//! - **Sharing**: every method takes `&self`; wrap a cache in `Arc` and
//!   hand it to whoever needs it
//!
//! ```
//! use pathcache::HierarchicalCache;
//!
//! let cache = HierarchicalCache::new(2)?;
//! cache.put(["a"], 1)?;
//! cache.put(["b"], 2)?;
//! cache.put(["c"], 3)?;
//!
//! assert!(cache.get(["a"]).unwrap_err().is_not_found());
//! assert_eq!(cache.get(["c"])?, 3);
//! # Ok::<(), pathcache::Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod flat;
mod lru;
mod stats;

pub use cache::HierarchicalCache;
pub use config::{CacheConfig, DEFAULT_MAX_ENTRIES};
pub use flat::FlatCache;
pub use pathtree::{Error, NodeId, PathKey, PathTree, Result};
pub use stats::{CacheStats, StatsSnapshot};
