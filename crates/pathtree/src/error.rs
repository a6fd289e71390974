//! Error types for pathtree

use thiserror::Error;

use crate::path::PathKey;

/// Result type alias for tree and cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tree and cache operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No value stored at the path
    #[error("No value at path: {path}")]
    NotFound {
        /// Path that was looked up
        path: PathKey,
    },

    /// Operation requires at least one segment
    #[error("Path must contain at least one segment")]
    EmptyPath,

    /// A sibling with the same segment already exists
    #[error("Segment already exists under parent: {segment:?}")]
    DuplicateSegment {
        /// Colliding segment
        segment: String,
    },

    /// The root node never carries a value and is never detached
    #[error("Operation not permitted on the root node")]
    RootNode,

    /// Leaf-only operation applied to a node with children
    #[error("Node has children and is not a leaf")]
    NotALeaf,

    /// Handle refers to a node that has been detached
    #[error("Node handle is stale")]
    StaleNode,

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Eviction could not bring the cache back under capacity
    #[error("Capacity invariant violated: size {size} exceeds max {max_entries} with no leaf to evict")]
    CapacityInvariant {
        /// Live entry count when eviction gave up
        size: usize,
        /// Configured limit
        max_entries: usize,
    },
}

impl Error {
    /// True for a plain cache miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
