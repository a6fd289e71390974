//! # pathtree
//!
//! Ordered tree of nodes addressed by path segments, used as the storage
//! engine underneath `pathcache`.
//!
//! ## Layout
//! - **Arena**: nodes live in a `Vec` slot table with a free list and are
//!   addressed by generation-checked [`NodeId`] handles
//! - **Children**: `BTreeMap` from segment to child handle, so sibling
//!   iteration order is stable
//! - **Recency**: a logical clock stamps every node a write passes through
//!
//! The tree never prunes valueless ancestors on its own; callers decide
//! when a subtree goes away.

#![warn(missing_docs)]

mod error;
mod path;
mod tree;

pub use error::{Error, Result};
pub use path::PathKey;
pub use tree::{NodeId, PathTree, Tick};
