//! Tree nodes and the lock guards used to walk them.
//!
//! Every node sits in its own `Arc<RwLock<_>>`. Guards are the owning
//! `arc_lock` variants from `parking_lot`, so a guard keeps its node alive
//! and can be carried across loop iterations while the next node is locked
//! (lock coupling).

use std::sync::{Arc, Weak};

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockUpgradableReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::internode::InternodeNode;
use crate::leaf::LeafNode;

/// Owning reference to a node.
pub(crate) type NodeRef<K, V> = Arc<RwLock<Node<K, V>>>;

/// Non-owning reference to a node (sibling links).
pub(crate) type WeakNodeRef<K, V> = Weak<RwLock<Node<K, V>>>;

/// Shared lock on a node that owns its `Arc`.
pub(crate) type ReadGuard<K, V> = ArcRwLockReadGuard<RawRwLock, Node<K, V>>;

/// Upgradable lock on a node that owns its `Arc`.
pub(crate) type UpgradableGuard<K, V> = ArcRwLockUpgradableReadGuard<RawRwLock, Node<K, V>>;

/// Exclusive lock on a node that owns its `Arc`.
pub(crate) type WriteGuard<K, V> = ArcRwLockWriteGuard<RawRwLock, Node<K, V>>;

/// A tree node: either a leaf holding entries or an internode holding
/// separators and children.
pub(crate) enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternodeNode<K, V>),
}

impl<K, V> Node<K, V> {
    /// A fresh empty leaf, ready to serve as a root.
    pub(crate) fn new_root_leaf() -> NodeRef<K, V> {
        Arc::new(RwLock::new(Self::Leaf(LeafNode::new())))
    }

    pub(crate) fn new_ref(self) -> NodeRef<K, V> {
        Arc::new(RwLock::new(self))
    }

    /// Number of keys held (entries for a leaf, separators for an internode).
    #[inline]
    pub(crate) fn nkeys(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.size(),
            Self::Internal(inode) => inode.nkeys(),
        }
    }

    /// Whether one more key can be added without a split.
    ///
    /// A node holds at most `order - 1` keys.
    #[inline]
    pub(crate) fn is_safe_for_insert(&self, order: usize) -> bool {
        self.nkeys() + 1 < order
    }

    /// Whether the node holds more keys than `order` allows.
    #[inline]
    pub(crate) fn is_overfull(&self, order: usize) -> bool {
        self.nkeys() >= order
    }

    /// Levels from this node down to the leaves, inclusive.
    #[inline]
    pub(crate) fn levels(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal(inode) => inode.height() as usize + 2,
        }
    }

    #[inline]
    pub(crate) const fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Internal(_) => None,
        }
    }

    #[inline]
    pub(crate) const fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<K, V>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Internal(_) => None,
        }
    }
}
