use std::collections::{btree_set, BTreeSet, HashSet};
use std::hash::Hash;

// Ordered set holding at most `capacity` elements. When an insertion overflows it, the
// greatest element (the last one in the ordering) is evicted. Membership checks go through a
// hash index.
#[derive(Debug, Clone)]
pub struct BoundedTreeSet<E> {
    capacity: usize,
    tree: BTreeSet<E>,
    members: HashSet<E>,
}

impl<E: Ord + Hash + Clone> BoundedTreeSet<E> {
    pub fn new(capacity: usize) -> Self {
        BoundedTreeSet {
            capacity,
            tree: BTreeSet::new(),
            members: HashSet::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    // Inserts `element` and returns the evicted element, if any. The evicted element may be
    // `element` itself when it is the greatest one.
    pub fn insert(&mut self, element: E) -> Option<E> {
        if !self.tree.insert(element.clone()) {
            return None;
        }
        self.members.insert(element);

        if self.tree.len() <= self.capacity {
            return None;
        }
        let evicted = self.tree.pop_last()?;
        self.members.remove(&evicted);
        Some(evicted)
    }

    pub fn contains(&self, element: &E) -> bool {
        self.members.contains(element)
    }

    pub fn first(&self) -> Option<&E> {
        self.tree.first()
    }

    pub fn last(&self) -> Option<&E> {
        self.tree.last()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, E> {
        self.tree.iter()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.members.clear();
    }
}

impl<'a, E> IntoIterator for &'a BoundedTreeSet<E> {
    type Item = &'a E;
    type IntoIter = btree_set::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.iter()
    }
}
