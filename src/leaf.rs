//! Leaf node for [`BPTree`](crate::BPTree).
//!
//! Leaves store the key/value entries in sorted order and are chained to
//! their neighbours through non-owning sibling links:
//!
//! ```text
//!   [L0] <-> [L1] <-> [L2] <-> [L3]      ascending key order
//! ```
//!
//! The chain is the only way range scans move between leaves. Links are
//! `Weak`, so the chain never keeps a node alive on its own; ownership
//! flows strictly from parent to child.

use std::sync::{Arc, Weak};

use crate::comparator::Comparator;
use crate::entry::Entry;
use crate::ksearch::{KeyIndexPosition, lower_bound_leaf};
use crate::node::{NodeRef, WeakNodeRef};

/// A leaf holding up to `order - 1` entries.
pub(crate) struct LeafNode<K, V> {
    entries: Vec<Entry<K, V>>,

    /// Previous leaf in key order.
    left: WeakNodeRef<K, V>,

    /// Next leaf in key order.
    right: WeakNodeRef<K, V>,
}

impl<K, V> LeafNode<K, V> {
    /// Create an empty, unlinked leaf.
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            left: Weak::new(),
            right: Weak::new(),
        }
    }

    #[inline(always)]
    pub(crate) fn size(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    #[inline]
    pub(crate) fn search<C: Comparator<K> + ?Sized>(&self, key: &K, cmp: &C) -> KeyIndexPosition {
        lower_bound_leaf(&self.entries, key, cmp)
    }

    /// Insert a new entry at logical position `p`.
    ///
    /// `p` must come from a `search` under the same exclusive lock.
    #[inline]
    pub(crate) fn insert_at(&mut self, p: usize, key: K, value: V) {
        self.entries.insert(p, Entry::new(key, value));
    }

    // ========================================================================
    //  Sibling links
    // ========================================================================

    /// The next leaf, if it is still alive.
    #[inline]
    pub(crate) fn right(&self) -> Option<NodeRef<K, V>> {
        self.right.upgrade()
    }

    /// The previous leaf, if it is still alive.
    #[inline]
    pub(crate) fn left(&self) -> Option<NodeRef<K, V>> {
        self.left.upgrade()
    }

    /// Whether `node` is this leaf's right neighbour.
    #[inline]
    pub(crate) fn right_is(&self, node: &NodeRef<K, V>) -> bool {
        std::ptr::eq(self.right.as_ptr(), Arc::as_ptr(node))
    }

    /// Whether `node` is this leaf's left neighbour.
    #[inline]
    pub(crate) fn left_is(&self, node: &NodeRef<K, V>) -> bool {
        std::ptr::eq(self.left.as_ptr(), Arc::as_ptr(node))
    }

    #[inline]
    pub(crate) fn has_left(&self) -> bool {
        self.left.strong_count() > 0
    }

    #[inline]
    pub(crate) fn has_right(&self) -> bool {
        self.right.strong_count() > 0
    }

    #[inline]
    pub(crate) fn set_left(&mut self, node: &NodeRef<K, V>) {
        self.left = Arc::downgrade(node);
    }

    #[inline]
    pub(crate) fn set_right(&mut self, node: &NodeRef<K, V>) {
        self.right = Arc::downgrade(node);
    }
}

impl<K: Clone, V> LeafNode<K, V> {
    /// Split this leaf in place.
    ///
    /// This leaf keeps the lower half. Returns the separator (a copy of the
    /// first key of the upper half) and the upper half as a new leaf whose
    /// links point at `this` on the left and at this leaf's old right
    /// neighbour on the right. The caller splices the new leaf into the
    /// chain once it has an `Arc`.
    pub(crate) fn split_off(&mut self, this: &NodeRef<K, V>) -> (K, Self) {
        let mid = self.entries.len() / 2;
        let upper = self.entries.split_off(mid);
        let Some(first) = upper.first() else {
            unreachable!("split of a leaf with fewer than two entries");
        };
        let separator = first.key().clone();

        let right = Self {
            entries: upper,
            left: Arc::downgrade(this),
            right: self.right.clone(),
        };

        (separator, right)
    }
}

impl<K, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
