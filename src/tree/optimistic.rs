//! Optimistic write path for [`BPTree`].
//!
//! Internodes are only share-locked on the way down and the leaf is taken
//! upgradable. That is enough for the two common cases:
//!
//! ```text
//! key present              -> overwrite under the entry's own lock
//! key absent, leaf has room -> upgrade leaf lock, insert, done
//! key absent, leaf full    -> give up, retry on the locked path
//! ```
//!
//! Nothing above the leaf is ever modified here, so the path never needs
//! more than a shared lock on an internode.

use std::sync::atomic::Ordering as AtomicOrdering;

use parking_lot::lock_api::ArcRwLockUpgradableReadGuard;

use crate::comparator::Comparator;
use crate::tracing_helpers::trace_log;

use super::BPTree;

impl<K, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Try to store without locking any internode exclusively.
    ///
    /// Returns the key and value back if the leaf would have to split.
    pub(super) fn store_optimistic(&self, key: K, value: V) -> Option<(K, V)> {
        let (guard, len) = self.reach_leaf_upgradable(&key);

        let Some(leaf) = guard.as_leaf() else {
            return Some((key, value));
        };

        let pos = leaf.search(&key, &self.comparator);
        if pos.found {
            // Readers of the leaf stay unblocked; only the entry is locked.
            let _old = leaf.entries()[pos.i].store(value);
            return None;
        }

        if !guard.is_safe_for_insert(self.order) {
            trace_log!(nkeys = guard.nkeys(), "leaf full, falling back to locked insert");
            return Some((key, value));
        }

        // The upgradable lock excludes other writers, so `pos` is still valid.
        let mut guard = ArcRwLockUpgradableReadGuard::upgrade(guard);
        let Some(leaf) = guard.as_leaf_mut() else {
            unreachable!("upgraded guard no longer holds a leaf");
        };
        leaf.insert_at(pos.i, key, value);
        drop(guard);

        len.fetch_add(1, AtomicOrdering::AcqRel);
        None
    }
}
