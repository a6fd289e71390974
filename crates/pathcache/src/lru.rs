//! Bounded LRU map backing [`FlatCache`](crate::FlatCache)
//!
//! Slots live in a `Vec` threaded by an intrusive doubly linked list, so
//! promotion and eviction are O(1).

use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

/// Entry in the recency list
struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU map with fixed capacity
pub(crate) struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    entries: Vec<Option<Entry<K, V>>>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty map holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            entries: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Look up a value and mark it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.entries[idx].as_ref().map(|entry| &entry.value)
    }

    /// Look up a value without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.entries[idx].as_ref().map(|entry| &entry.value)
    }

    /// True if the key is present
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or overwrite, returning the entry evicted to make room
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(entry) = &mut self.entries[idx] {
                entry.value = value;
            }
            self.move_to_front(idx);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let idx = self.alloc_slot();
        self.entries[idx] = Some(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.entries[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.map.insert(key, idx);
        evicted
    }

    /// Remove a key, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.free_list.push(idx);
        self.entries[idx].take().map(|entry| entry.value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.map.clear();
        self.entries.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            cursor: self.head,
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(entry) = &mut self.entries[idx] {
            entry.prev = None;
            entry.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.entries[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.entries[idx] {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_entry) = &mut self.entries[prev_idx] {
                    prev_entry.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_entry) = &mut self.entries[next_idx] {
                    next_entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let tail_idx = self.tail?;
        // Unlink while the entry is still in its slot; unlink reads its neighbours.
        self.unlink(tail_idx);
        let entry = self.entries[tail_idx].take()?;
        self.map.remove(&entry.key);
        self.free_list.push(tail_idx);
        Some((entry.key, entry.value))
    }

    fn alloc_slot(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.entries.len();
            self.entries.push(None);
            idx
        }
    }
}

/// Iterator over an [`LruCache`], most recent first
pub(crate) struct Iter<'a, K, V> {
    entries: &'a [Option<Entry<K, V>>],
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.cursor?)?.as_ref()?;
        self.cursor = entry.next;
        Some((&entry.key, &entry.value))
    }
}
