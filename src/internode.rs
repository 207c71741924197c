//! Internode (internal node) for `BPTree`.
//!
//! Internodes route traversals through the tree. They contain only
//! separator keys and child pointers, no values. Values live in leaves.
//!
//! # B+Tree Routing Model
//!
//! ```text
//!         [K0 | K1 | K2]           <- Internode (3 keys, 4 children)
//!        /    |    |    \
//!    C0     C1    C2     C3        <- Children
//!
//!    C0: keys < K0
//!    C1: keys >= K0 and < K1
//!    C2: keys >= K1 and < K2
//!    C3: keys >= K2
//! ```
//!
//! # Thread Safety
//!
//! An internode is only ever reached through its owning `RwLock`. Readers
//! hold the shared lock while picking a child, writers hold the exclusive
//! lock while inserting a separator or splitting.

use crate::comparator::Comparator;
use crate::ksearch::upper_bound_internal;
use crate::node::NodeRef;

// ============================================================================
//  InternodeNode
// ============================================================================

/// An internal routing node.
///
/// # Invariants
/// - `children.len() == keys.len() + 1`
/// - Keys are strictly ascending under the tree's comparator
/// - `children[i]` contains keys `< keys[i]`
/// - `children[i + 1]` contains keys `>= keys[i]`
pub(crate) struct InternodeNode<K, V> {
    /// Tree height below this node (0 = children are leaves, 1+ = children are internodes).
    height: u32,

    /// Separator keys in sorted order.
    keys: Vec<K>,

    /// Owned child nodes.
    children: Vec<NodeRef<K, V>>,
}

impl<K, V> InternodeNode<K, V> {
    /// Create a root internode above two freshly split siblings.
    pub(crate) fn new_root(
        height: u32,
        left: NodeRef<K, V>,
        separator: K,
        right: NodeRef<K, V>,
    ) -> Self {
        Self {
            height,
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    #[inline(always)]
    pub(crate) const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the children of this internode are leaves.
    #[inline(always)]
    pub(crate) const fn children_are_leaves(&self) -> bool {
        self.height == 0
    }

    #[inline(always)]
    pub(crate) fn nkeys(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline(always)]
    pub(crate) fn children(&self) -> &[NodeRef<K, V>] {
        &self.children
    }

    /// Child index covering `key`.
    #[inline]
    pub(crate) fn route<C: Comparator<K> + ?Sized>(&self, key: &K, cmp: &C) -> usize {
        upper_bound_internal(&self.keys, key, cmp)
    }

    /// Child covering `key`.
    #[inline]
    pub(crate) fn child_for<C: Comparator<K> + ?Sized>(&self, key: &K, cmp: &C) -> &NodeRef<K, V> {
        &self.children[self.route(key, cmp)]
    }

    /// Insert a separator and the new right sibling produced by splitting
    /// the child that covers `separator`.
    ///
    /// The new child goes directly to the right of the split child.
    pub(crate) fn insert_key_and_child<C: Comparator<K> + ?Sized>(
        &mut self,
        separator: K,
        right_child: NodeRef<K, V>,
        cmp: &C,
    ) {
        let p = self.route(&separator, cmp);
        self.keys.insert(p, separator);
        self.children.insert(p + 1, right_child);
    }

    /// Split this internode in place.
    ///
    /// Keeps the lower half, returns the pushed-up separator and the upper
    /// half. The separator leaves this level entirely.
    pub(crate) fn split_off(&mut self) -> (K, Self) {
        let mid = self.keys.len() / 2;

        let right_keys = self.keys.split_off(mid + 1);
        let right_children = self.children.split_off(mid + 1);
        let separator = self
            .keys
            .pop()
            .unwrap_or_else(|| unreachable!("split of an internode without keys"));

        let right = Self {
            height: self.height,
            keys: right_keys,
            children: right_children,
        };

        (separator, right)
    }
}
