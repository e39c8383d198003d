//! Free-list of removed node ids.
//!
//! Removing a node does not touch its record; the id is only remembered here
//! so the allocator above the store can hand the slot out again. The list is
//! a set in insertion order and lives for one session; it is not persisted.

use indexmap::IndexSet;

use super::store_types::NodeId;

/// Order in which the allocator takes reclaimed ids back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseOrder {
    /// Most recently removed first
    Lifo,
    /// Least recently removed first
    Fifo,
}

/// Append-only set of reclaimed node ids
#[derive(Debug, Default, Clone)]
pub struct FreeList {
    ids: IndexSet<NodeId>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as free. Returns false if it was already recorded.
    pub fn record(&mut self, id: NodeId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in the order they were removed.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids.iter().copied()
    }

    /// Takes one id back out for reuse.
    pub fn take(&mut self, order: ReuseOrder) -> Option<NodeId> {
        match order {
            ReuseOrder::Lifo => self.ids.pop(),
            ReuseOrder::Fifo => self.ids.shift_remove_index(0),
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_a_set() {
        let mut list = FreeList::new();
        assert!(list.is_empty());
        assert!(list.record(4));
        assert!(list.record(2));
        assert!(!list.record(4));
        assert_eq!(list.len(), 2);
        assert!(list.contains(2));
        assert!(!list.contains(3));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    fn test_take_lifo() {
        let mut list = FreeList::new();
        for id in [5, 6, 7] {
            list.record(id);
        }
        assert_eq!(list.take(ReuseOrder::Lifo), Some(7));
        assert_eq!(list.take(ReuseOrder::Lifo), Some(6));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_take_fifo() {
        let mut list = FreeList::new();
        for id in [5, 6, 7] {
            list.record(id);
        }
        assert_eq!(list.take(ReuseOrder::Fifo), Some(5));
        assert_eq!(list.take(ReuseOrder::Fifo), Some(6));
        assert_eq!(list.take(ReuseOrder::Fifo), Some(7));
        assert_eq!(list.take(ReuseOrder::Fifo), None);
    }

    #[test]
    fn test_clear() {
        let mut list = FreeList::new();
        list.record(1);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.take(ReuseOrder::Lifo), None);
    }
}
