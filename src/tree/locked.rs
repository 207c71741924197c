//! Locked (pessimistic) write path for [`BPTree`].
//!
//! Used when the optimistic path finds a full leaf. The descent write-locks
//! every node top-down and keeps a node's ancestors locked only while the
//! node could still split:
//!
//! ```text
//! root (W) -> internode (W) -> ... -> leaf (W)
//!              ^ released as soon as a node below has room
//! ```
//!
//! The ancestors still held when the leaf is reached are exactly the nodes
//! a split can climb through, so propagation never has to lock upward.
//! The root cell is only taken, briefly, if the split reaches the root.
//! Node locks are only ever taken top-down (and leaf-to-leaf left-to-right
//! while splicing the sibling chain), which rules out lock-order cycles.

use std::sync::atomic::Ordering as AtomicOrdering;

use crate::comparator::Comparator;
use crate::node::{Node, WriteGuard};
use crate::tracing_helpers::trace_log;

use super::BPTree;

impl<K: Clone, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Store `key` with exclusive lock coupling, splitting as needed.
    pub(super) fn store_locked(&self, key: K, value: V) {
        let (mut guard, len) = self.lock_root(|node, _| node.write_arc());

        // Locked ancestors of `guard`, top-down. Only nodes that may still
        // have to absorb a split stay here.
        let mut path: Vec<WriteGuard<K, V>> = Vec::new();

        loop {
            let next: Option<WriteGuard<K, V>> = match &*guard {
                Node::Leaf(_) => None,
                Node::Internal(inode) => {
                    Some(inode.child_for(&key, &self.comparator).write_arc())
                }
            };

            let Some(child) = next else {
                break;
            };

            path.push(std::mem::replace(&mut guard, child));

            if guard.is_safe_for_insert(self.order) {
                path.clear();
            }
        }

        trace_log!(held = path.len(), "reached leaf");

        let Some(leaf) = guard.as_leaf_mut() else {
            unreachable!("locked descent stopped above the leaf level");
        };

        let pos = leaf.search(&key, &self.comparator);
        if pos.found {
            drop(path);
            let _old = leaf.entries()[pos.i].store(value);
            return;
        }

        leaf.insert_at(pos.i, key, value);
        len.fetch_add(1, AtomicOrdering::AcqRel);

        if guard.is_overfull(self.order) {
            self.propagate_split(guard, path);
        }
    }
}
