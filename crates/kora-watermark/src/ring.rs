//! Fixed-capacity ring of processed message ids.
//!
//! The capacity bound is structural: an insert past capacity evicts the
//! oldest entry before adding the new one, so `len() <= capacity` holds
//! at every point, not just after a periodic cleanup.

use std::collections::{HashSet, VecDeque};

#[derive(Debug)]
pub struct ProcessedRing {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl ProcessedRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Rebuild from persisted ids, oldest first. Ids beyond capacity are
    /// dropped from the old end.
    pub fn from_ids(capacity: usize, ids: Vec<String>) -> Self {
        let mut ring = Self::new(capacity);
        for id in ids {
            ring.insert(id);
        }
        ring
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Insert an id, evicting the oldest entry when full. Re-inserting a
    /// known id is a no-op (it keeps its original age).
    pub fn insert(&mut self, id: String) {
        if self.seen.contains(&id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(id.clone());
        self.order.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids oldest first, for snapshotting.
    pub fn ids(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut ring = ProcessedRing::new(3);
        ring.insert("a".into());
        ring.insert("b".into());
        assert!(ring.contains("a"));
        assert!(ring.contains("b"));
        assert!(!ring.contains("c"));
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let mut ring = ProcessedRing::new(3);
        for id in ["a", "b", "c", "d"] {
            ring.insert(id.into());
        }
        assert_eq!(ring.len(), 3);
        assert!(!ring.contains("a"), "oldest entry should be evicted");
        assert!(ring.contains("b"));
        assert!(ring.contains("d"));
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut ring = ProcessedRing::new(5);
        for i in 0..100 {
            ring.insert(format!("msg{i}"));
            assert!(ring.len() <= 5);
        }
        assert_eq!(ring.len(), 5);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut ring = ProcessedRing::new(2);
        ring.insert("a".into());
        ring.insert("a".into());
        assert_eq!(ring.len(), 1);
        ring.insert("b".into());
        ring.insert("c".into());
        // "a" was oldest and goes first.
        assert!(!ring.contains("a"));
        assert!(ring.contains("b"));
        assert!(ring.contains("c"));
    }

    #[test]
    fn test_from_ids_respects_capacity() {
        let ids = (0..10).map(|i| format!("m{i}")).collect();
        let ring = ProcessedRing::from_ids(4, ids);
        assert_eq!(ring.len(), 4);
        assert!(!ring.contains("m5"));
        assert!(ring.contains("m6"));
        assert!(ring.contains("m9"));
        assert_eq!(ring.ids(), vec!["m6", "m7", "m8", "m9"]);
    }
}
