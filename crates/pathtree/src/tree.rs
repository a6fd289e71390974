//! Path-segment tree
//!
//! Nodes live in an arena of slots and refer to each other by [`NodeId`].
//! A parent owns its children through a segment-keyed map; the child keeps
//! only the parent's id, so there are no ownership cycles.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::path::PathKey;

/// Handle to a node in a [`PathTree`]
///
/// The generation changes whenever a slot is recycled, so a handle to a
/// detached node stays stale instead of aliasing whatever reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Logical access time; larger is more recent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(u64);

struct Node<V> {
    key: String,
    value: Option<V>,
    children: BTreeMap<String, NodeId>,
    parent: Option<NodeId>,
    last_accessed: Tick,
}

impl<V> Node<V> {
    fn new(key: String, parent: Option<NodeId>, now: Tick) -> Self {
        Self {
            key,
            value: None,
            children: BTreeMap::new(),
            parent,
            last_accessed: now,
        }
    }
}

struct Slot<V> {
    generation: u32,
    node: Option<Node<V>>,
}

/// Ordered tree of nodes addressed by path segments
pub struct PathTree<V> {
    slots: Vec<Slot<V>>,
    free_list: Vec<usize>,
    root: NodeId,
    clock: u64,
    /// Nodes holding a value
    size: usize,
    /// Live nodes, root excluded
    nodes: usize,
}

impl<V> Default for PathTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PathTree<V> {
    /// Create a tree holding only the root
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };

        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(String::new(), None, Tick(0))),
            }],
            free_list: Vec::new(),
            root,
            clock: 0,
            size: 0,
            nodes: 0,
        }
    }

    /// Handle to the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes holding a value
    ///
    /// Valueless organizational nodes and the root do not count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of live nodes, excluding the root
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// True if no node holds a value
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True if `id` refers to a live node
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Walk `path` from the root, creating missing valueless nodes
    ///
    /// Every node on the way, root included, is stamped with the same
    /// fresh tick. Returns the terminal node.
    pub fn resolve_or_create(&mut self, path: &PathKey) -> Result<NodeId> {
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let now = self.tick();
        let mut current = self.root;
        self.node_mut(current)?.last_accessed = now;

        for segment in path.iter() {
            let existing = self.node(current)?.children.get(segment).copied();
            let next = match existing {
                Some(child) => child,
                None => self.attach(current, segment.to_owned(), now)?,
            };
            self.node_mut(next)?.last_accessed = now;
            current = next;
        }

        Ok(current)
    }

    /// Walk `path` from the root without mutating anything
    ///
    /// An empty path resolves to the root.
    pub fn resolve(&self, path: &PathKey) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path.iter() {
            current = *self.node(current).ok()?.children.get(segment)?;
        }
        Some(current)
    }

    /// Store `value` on a node, returning the previous value
    pub fn set_value(&mut self, id: NodeId, value: V) -> Result<Option<V>> {
        if id == self.root {
            return Err(Error::RootNode);
        }

        let now = self.tick();
        let node = self.node_mut(id)?;
        node.last_accessed = now;
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.size += 1;
        }
        Ok(previous)
    }

    /// Clear a node's value, leaving the node in place
    pub fn take_value(&mut self, id: NodeId) -> Result<Option<V>> {
        let previous = self.node_mut(id)?.value.take();
        if previous.is_some() {
            self.size -= 1;
        }
        Ok(previous)
    }

    /// Borrow a node's value
    pub fn value(&self, id: NodeId) -> Result<Option<&V>> {
        Ok(self.node(id)?.value.as_ref())
    }

    /// Segment under which the node hangs off its parent
    pub fn key(&self, id: NodeId) -> Result<&str> {
        Ok(&self.node(id)?.key)
    }

    /// Parent handle, `None` for the root
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Number of direct children
    pub fn child_count(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.children.len())
    }

    /// Last access tick of a node
    pub fn last_accessed(&self, id: NodeId) -> Result<Tick> {
        Ok(self.node(id)?.last_accessed)
    }

    /// Refresh a node and all of its ancestors
    pub fn touch(&mut self, id: NodeId) -> Result<()> {
        let now = self.tick();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id)?;
            node.last_accessed = now;
            current = node.parent;
        }
        Ok(())
    }

    /// Attach a new valueless child under `parent`
    ///
    /// Fails with [`Error::DuplicateSegment`] if the segment is taken.
    pub fn insert_child(&mut self, parent: NodeId, key: &str) -> Result<NodeId> {
        if self.node(parent)?.children.contains_key(key) {
            return Err(Error::DuplicateSegment {
                segment: key.to_owned(),
            });
        }

        let now = self.tick();
        let child = self.attach(parent, key.to_owned(), now)?;
        self.touch(child)?;
        Ok(child)
    }

    /// Find the oldest leaf below `id`
    ///
    /// Descends into the least recently accessed child at every level until
    /// it reaches a node without children. Equal ticks resolve to the first
    /// child in segment order. Returns `id` itself when it has no children.
    pub fn oldest_leaf_under(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        loop {
            let mut oldest: Option<(NodeId, Tick)> = None;
            for &child in self.node(current)?.children.values() {
                let tick = self.node(child)?.last_accessed;
                if oldest.map_or(true, |(_, best)| tick < best) {
                    oldest = Some((child, tick));
                }
            }

            match oldest {
                Some((child, _)) => current = child,
                None => return Ok(current),
            }
        }
    }

    /// Remove a childless node from its parent, returning its value
    ///
    /// The parent is left in place even if this empties it.
    pub fn detach_leaf(&mut self, id: NodeId) -> Result<Option<V>> {
        if id == self.root {
            return Err(Error::RootNode);
        }
        if !self.node(id)?.children.is_empty() {
            return Err(Error::NotALeaf);
        }

        self.unlink_from_parent(id)?;
        let node = self.free(id)?;
        trace!(key = %node.key, "detached leaf");
        if node.value.is_some() {
            self.size -= 1;
        }
        Ok(node.value)
    }

    /// Remove a node and everything below it
    ///
    /// Returns the number of values dropped.
    pub fn detach_subtree(&mut self, id: NodeId) -> Result<usize> {
        if id == self.root {
            return Err(Error::RootNode);
        }

        self.unlink_from_parent(id)?;

        let mut dropped = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.free(current)?;
            if node.value.is_some() {
                dropped += 1;
            }
            stack.extend(node.children.into_values());
        }

        self.size -= dropped;
        trace!(dropped, "detached subtree");
        Ok(dropped)
    }

    /// Values held strictly below `id`, pre-order, siblings by segment
    pub fn descendant_values(&self, id: NodeId) -> Result<Vec<&V>> {
        let mut values = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id)?.children.values().rev().copied().collect();

        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            if let Some(value) = &node.value {
                values.push(value);
            }
            stack.extend(node.children.values().rev().copied());
        }

        Ok(values)
    }

    /// Every valued node with its full path, pre-order
    pub fn entries(&self) -> Result<Vec<(PathKey, &V)>> {
        let mut entries = Vec::new();
        let mut stack: Vec<(NodeId, PathKey)> = Vec::new();
        self.push_children(self.root, &PathKey::default(), &mut stack)?;

        while let Some((current, path)) = stack.pop() {
            let node = self.node(current)?;
            if let Some(value) = &node.value {
                entries.push((path.clone(), value));
            }
            self.push_children(current, &path, &mut stack)?;
        }

        Ok(entries)
    }

    /// Rebuild the path of a node by following parent links
    pub fn path_of(&self, id: NodeId) -> Result<PathKey> {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            segments.push(self.node(current)?.key.clone());
            current = parent;
        }
        segments.reverse();
        Ok(PathKey::new(segments))
    }

    /// Drop every node except the root
    ///
    /// Slots are retired in place so handles taken before the clear stay
    /// stale after their slots are reused.
    pub fn clear(&mut self) {
        let root = self.root.index;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if index == root || slot.node.take().is_none() {
                continue;
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(index);
        }

        if let Some(root) = self.slots[root].node.as_mut() {
            root.children.clear();
        }
        self.size = 0;
        self.nodes = 0;
    }

    fn tick(&mut self) -> Tick {
        self.clock += 1;
        Tick(self.clock)
    }

    fn node(&self, id: NodeId) -> Result<&Node<V>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::StaleNode)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<V>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(Error::StaleNode)
    }

    fn push_children(
        &self,
        id: NodeId,
        path: &PathKey,
        stack: &mut Vec<(NodeId, PathKey)>,
    ) -> Result<()> {
        for (key, &child) in self.node(id)?.children.iter().rev() {
            stack.push((child, path.join(key.as_str())));
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, key: String, now: Tick) -> Result<NodeId> {
        // Validate the parent before taking a slot.
        self.node(parent)?;

        let index = self.alloc_slot();
        let slot = &mut self.slots[index];
        slot.node = Some(Node::new(key.clone(), Some(parent), now));
        let child = NodeId {
            index,
            generation: slot.generation,
        };

        self.node_mut(parent)?.children.insert(key, child);
        self.nodes += 1;
        Ok(child)
    }

    fn unlink_from_parent(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let key = node.key.clone();
        let parent = node.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.remove(&key);
        }
        Ok(())
    }

    fn alloc_slot(&mut self) -> usize {
        if let Some(index) = self.free_list.pop() {
            index
        } else {
            let index = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                node: None,
            });
            index
        }
    }

    fn free(&mut self, id: NodeId) -> Result<Node<V>> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(Error::StaleNode)?;
        let node = slot.node.take().ok_or(Error::StaleNode)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.nodes -= 1;
        Ok(node)
    }
}
