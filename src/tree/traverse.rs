//! Tree traversal helpers for reaching leaf nodes, and point lookup.
//!
//! Every descent is lock-coupled: the child's lock is taken before the
//! parent's is released, so a split can never move a key out from under a
//! reader between two levels.
//!
//! The root cell is never held while waiting for a node lock. A descent
//! snapshots the root, locks it, and then checks that it is still the
//! root. Root growth swaps the cell while holding the old root
//! exclusively, so a root that passes the check cannot be replaced until
//! its lock is released.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use crate::comparator::Comparator;
use crate::node::{Node, NodeRef, ReadGuard, UpgradableGuard};
use crate::tracing_helpers::trace_log;

use super::BPTree;

/// One step of an optimistic write descent.
enum Step<K, V> {
    Inner(ReadGuard<K, V>),
    Leaf(UpgradableGuard<K, V>),
}

impl<K, V, C> BPTree<K, V, C> {
    /// Lock the current root with `lock` and return the guard together with
    /// that root's entry counter.
    ///
    /// `lock` also receives the root's level count, read in the same
    /// snapshot as the node. Retries if a root split or a purge replaced
    /// the root before its lock was acquired.
    pub(super) fn lock_root<G, F>(&self, mut lock: F) -> (G, Arc<AtomicUsize>)
    where
        F: FnMut(&NodeRef<K, V>, usize) -> G,
    {
        loop {
            let (node, levels, len) = {
                let cell = self.root.read();
                (Arc::clone(&cell.node), cell.levels, Arc::clone(&cell.len))
            };

            let guard = lock(&node, levels);
            if self.is_root(&node) {
                return (guard, len);
            }

            trace_log!("root replaced while locking it, retrying");
        }
    }

    /// Whether `node` is the current root.
    pub(super) fn is_root(&self, node: &NodeRef<K, V>) -> bool {
        Arc::ptr_eq(&self.root.read().node, node)
    }
}

impl<K, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Reach the leaf that contains or would contain `key`, holding it
    /// under a shared lock.
    pub(super) fn reach_leaf_read(&self, key: &K) -> ReadGuard<K, V> {
        let (mut guard, _) = self.lock_root(|node, _| node.read_arc());

        loop {
            let next: Option<ReadGuard<K, V>> = match &*guard {
                Node::Leaf(_) => None,
                Node::Internal(inode) => Some(inode.child_for(key, &self.comparator).read_arc()),
            };

            match next {
                Some(child) => guard = child,
                None => return guard,
            }
        }
    }

    /// Reach the leaf for `key` holding it upgradable, internodes shared.
    ///
    /// Also returns the entry counter of the root the descent started from.
    pub(super) fn reach_leaf_upgradable(
        &self,
        key: &K,
    ) -> (UpgradableGuard<K, V>, Arc<AtomicUsize>) {
        // Node kinds never change, so the snapshot's level count tells us
        // how to lock the root.
        let (mut step, len) = self.lock_root(|node, levels| {
            if levels == 1 {
                Step::Leaf(node.upgradable_read_arc())
            } else {
                Step::Inner(node.read_arc())
            }
        });

        loop {
            let guard = match step {
                Step::Inner(guard) => guard,
                Step::Leaf(leaf) => return (leaf, len),
            };

            step = match &*guard {
                Node::Internal(inode) => {
                    let child = inode.child_for(key, &self.comparator);
                    if inode.children_are_leaves() {
                        Step::Leaf(child.upgradable_read_arc())
                    } else {
                        Step::Inner(child.read_arc())
                    }
                }
                Node::Leaf(_) => unreachable!("leaf above the leaf level"),
            };
        }
    }
}

impl<K, V: Clone, C: Comparator<K>> BPTree<K, V, C> {
    /// Look up `key`.
    ///
    /// Returns a clone of the stored value, or `None` if the key is absent.
    #[must_use]
    pub fn load(&self, key: &K) -> Option<V> {
        let guard = self.reach_leaf_read(key);
        let leaf = guard.as_leaf()?;

        let pos = leaf.search(key, &self.comparator);
        pos.found.then(|| leaf.entries()[pos.i].load())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        let guard = self.reach_leaf_read(key);
        guard
            .as_leaf()
            .is_some_and(|leaf| leaf.search(key, &self.comparator).found)
    }
}
