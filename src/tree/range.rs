//! Range scans over the leaf sibling chain.
//!
//! A scan descends once to the leaf covering `start`, then walks the chain
//! instead of going back through the root for every leaf.
//!
//! # Forward
//!
//! Lock-coupled left-to-right: the next leaf is locked before the current
//! one is released. This is the same direction splits lock neighbours in,
//! so the two never wait on each other in a cycle.
//!
//! # Backward
//!
//! Locking right-to-left while holding a leaf could deadlock against a
//! split, so the current leaf is released first. By the time the left
//! neighbour is locked it may have split; its upper half then sits between
//! it and the leaf just scanned. The scan moves right from the stale
//! neighbour until it finds the leaf whose right link points back at where
//! it came from:
//!
//! ```text
//! scanned: [C]          stale left link: [L]
//! now:     [L] <-> [L'] <-> [C]          L.right != C  => move to L'
//! ```
//!
//! Keys stored concurrently with a scan may or may not be returned.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::lock_api::ArcRwLockReadGuard;

use crate::comparator::Comparator;
use crate::node::{NodeRef, ReadGuard};
use crate::tracing_helpers::trace_log;

use super::BPTree;

impl<K, V: Clone, C: Comparator<K>> BPTree<K, V, C> {
    /// Values for every key in `[start, end]`, ascending.
    ///
    /// Empty if `start` orders after `end`.
    #[must_use]
    pub fn slice(&self, start: &K, end: &K) -> Vec<V> {
        let cmp = &self.comparator;
        let mut out: Vec<V> = Vec::new();
        if cmp.compare(start, end) == Ordering::Greater {
            return out;
        }

        let mut guard: ReadGuard<K, V> = self.reach_leaf_read(start);

        loop {
            let Some(leaf) = guard.as_leaf() else {
                return out;
            };

            for entry in leaf.entries() {
                if cmp.compare(entry.key(), start) == Ordering::Less {
                    continue;
                }
                if cmp.compare(entry.key(), end) == Ordering::Greater {
                    return out;
                }
                out.push(entry.load());
            }

            let Some(next) = leaf.right() else {
                return out;
            };
            let next_guard = next.read_arc();
            guard = next_guard;
        }
    }

    /// Values for every key in `[end, start]`, descending.
    ///
    /// Empty if `start` orders before `end`.
    #[must_use]
    pub fn reverse_slice(&self, start: &K, end: &K) -> Vec<V> {
        let cmp = &self.comparator;
        let mut out: Vec<V> = Vec::new();
        if cmp.compare(start, end) == Ordering::Less {
            return out;
        }

        let mut guard: ReadGuard<K, V> = self.reach_leaf_read(start);

        loop {
            let Some(leaf) = guard.as_leaf() else {
                return out;
            };

            for entry in leaf.entries().iter().rev() {
                if cmp.compare(entry.key(), start) == Ordering::Greater {
                    continue;
                }
                if cmp.compare(entry.key(), end) == Ordering::Less {
                    return out;
                }
                out.push(entry.load());
            }

            let Some(left) = leaf.left() else {
                return out;
            };
            let current: NodeRef<K, V> = Arc::clone(ArcRwLockReadGuard::rwlock(&guard));
            drop(guard);

            let Some(left_guard) = Self::lock_left_neighbour(&left, &current) else {
                return out;
            };
            guard = left_guard;
        }
    }

    /// Lock the leaf directly left of `current`, starting from a possibly
    /// stale left link.
    ///
    /// `None` if the chain ends before reaching `current`, which only
    /// happens once the tree `current` belongs to has been purged.
    fn lock_left_neighbour(
        left: &NodeRef<K, V>,
        current: &NodeRef<K, V>,
    ) -> Option<ReadGuard<K, V>> {
        let mut guard: ReadGuard<K, V> = left.read_arc();

        loop {
            let leaf = guard.as_leaf()?;
            if leaf.right_is(current) {
                return Some(guard);
            }

            trace_log!("left neighbour split during reverse scan, moving right");
            let next = leaf.right()?;
            let next_guard = next.read_arc();
            guard = next_guard;
        }
    }
}
