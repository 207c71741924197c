//! Hand-over-hand split propagation.
//!
//! # Key Invariant
//! A split node stays locked until its parent has been updated with the
//! new separator and right sibling. There is never a moment where the new
//! sibling exists but cannot be reached from above.
//!
//! The parent is already locked when propagation starts: the locked write
//! path keeps every ancestor that could receive a separator, so splitting
//! climbs through guards it owns and never acquires a node lock upward.
//! Only a root split takes the root cell, and only for the swap.
//!
//! # Leaf splits
//!
//! ```text
//! before:  [P] <-> [L: a b c d] <-> [N]
//! after:   [P] <-> [L: a b] <-> [R: c d] <-> [N]      separator `c` copied up
//! ```
//!
//! The split leaf keeps its identity and its lower half, so readers that
//! already hold a reference to it still find every key they could find
//! before, or are told via the sibling chain where the rest went.
//!
//! # Internode splits
//!
//! The middle separator moves up; it is not kept at this level.

use std::sync::Arc;

use parking_lot::lock_api::ArcRwLockWriteGuard;

use crate::comparator::Comparator;
use crate::internode::InternodeNode;
use crate::node::{Node, NodeRef, WriteGuard};
use crate::tracing_helpers::debug_log;

use super::BPTree;

impl<K: Clone, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Split the overfull node under `guard`, then keep inserting the
    /// promoted separator into ancestors until one has room.
    ///
    /// `path` holds the locked ancestors of `guard`, top-down. If it runs
    /// out while a node is still overfull, that node is the root.
    pub(super) fn propagate_split(
        &self,
        mut guard: WriteGuard<K, V>,
        mut path: Vec<WriteGuard<K, V>>,
    ) {
        loop {
            let (separator, right) = Self::split_node(&mut guard);

            let Some(mut parent) = path.pop() else {
                self.grow_root(&guard, separator, right);
                return;
            };

            match &mut *parent {
                Node::Internal(inode) => {
                    inode.insert_key_and_child(separator, right, &self.comparator);
                }
                Node::Leaf(_) => unreachable!("leaf on the ancestor path"),
            }

            // Child released only now that its sibling is linked from above.
            drop(guard);

            if !parent.is_overfull(self.order) {
                return;
            }
            guard = parent;
        }
    }

    /// Split one node in place, returning the separator for its parent and
    /// the new right sibling.
    fn split_node(guard: &mut WriteGuard<K, V>) -> (K, NodeRef<K, V>) {
        let this: NodeRef<K, V> = Arc::clone(ArcRwLockWriteGuard::rwlock(guard));

        match &mut **guard {
            Node::Leaf(leaf) => {
                let old_right = leaf.right();
                let (separator, upper) = leaf.split_off(&this);
                let right = Node::Leaf(upper).new_ref();
                leaf.set_right(&right);

                // Left-to-right: the split leaf is held while its old right
                // neighbour is locked, never the reverse.
                if let Some(neighbour) = old_right {
                    let mut next = neighbour.write();
                    if let Some(n) = next.as_leaf_mut() {
                        n.set_left(&right);
                    }
                    drop(next);
                }

                debug_log!(kept = leaf.size(), "leaf split");
                (separator, right)
            }
            Node::Internal(inode) => {
                let (separator, upper) = inode.split_off();
                debug_log!(
                    height = inode.height(),
                    kept = inode.nkeys(),
                    moved = upper.nkeys(),
                    "internode split"
                );
                (separator, Node::Internal(upper).new_ref())
            }
        }
    }

    /// Put a new internode above the split root.
    ///
    /// The old root stays write-locked until the cell points at its new
    /// parent, so a descent waiting on it finds it is no longer the root
    /// and starts over from the new one.
    fn grow_root(&self, old_root: &WriteGuard<K, V>, separator: K, right: NodeRef<K, V>) {
        let left = Arc::clone(ArcRwLockWriteGuard::rwlock(old_root));
        let height = match &**old_root {
            Node::Leaf(_) => 0,
            Node::Internal(inode) => inode.height() + 1,
        };
        let new_root =
            Node::Internal(InternodeNode::new_root(height, left, separator, right)).new_ref();

        let mut cell = self.root.write();
        if !Arc::ptr_eq(&cell.node, ArcRwLockWriteGuard::rwlock(old_root)) {
            // Purged while this split ran; the detached tree is discarded.
            drop(cell);
            debug_log!(name = %self.name, "root split in a purged tree");
            return;
        }

        cell.node = new_root;
        cell.levels += 1;
        debug_log!(name = %self.name, levels = cell.levels, "root split");
        drop(cell);
    }
}
