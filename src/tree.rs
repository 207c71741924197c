//! `BPTree` - A concurrent ordered B+Tree.
//!
//! This module provides the main [`BPTree<K, V, C>`] type, its construction
//! error, and the [`Purge`] capability consumed by cache registries.
//!
//! # Locking
//!
//! ```text
//! root cell   RwLock<Root>          swapped by purge, grown by root splits
//!   node      Arc<RwLock<Node>>     one lock per node
//!     entry   RwLock<V>             one lock per value
//! ```
//!
//! - **Readers** (`load`, scan descent) snapshot the root from the cell,
//!   lock it shared, confirm it is still the root, and couple shared locks
//!   down to the leaf. The cell is never held while waiting on a node.
//! - **Writers** first run the optimistic path (`optimistic`): shared
//!   internodes, upgradable leaf. A full leaf sends them to the locked
//!   path (`locked`), which couples exclusive locks from the root down
//!   and releases ancestors as soon as a node with room is reached.
//! - **Splits** (`split`) climb only through ancestors already held. A
//!   root split write-locks the cell just long enough to swap in the new
//!   root.
//! - **Scans** (`range`) walk the leaf chain; forward couples
//!   left-to-right, backward releases before moving left.
//!
//! Node locks are acquired top-down, or left-to-right between leaves, and
//! the cell is only ever taken last and released without waiting on
//! anything else, so no two threads can wait on each other in a cycle.

use std::fmt as StdFmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::comparator::{Comparator, NaturalOrder, TimeOrder};
use crate::node::{Node, NodeRef};
use crate::tracing_helpers::debug_log;

mod locked;
mod optimistic;
mod range;
mod split;
mod traverse;
mod validate;

pub use validate::{InvariantViolation, TreeShape};

/// Order used by [`BPTree::with_default_order`].
pub const DEFAULT_ORDER: usize = 32;

/// Smallest order accepted by the constructors.
pub const MIN_ORDER: usize = 2;

// ============================================================================
//  BuildError
// ============================================================================

/// Errors that can occur while constructing a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The order is below [`MIN_ORDER`]; a node could hold no keys.
    OrderTooSmall {
        /// The rejected order.
        order: usize,
    },
}

impl StdFmt::Display for BuildError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::OrderTooSmall { order } => {
                write!(f, "order must be at least {MIN_ORDER}, got {order}")
            }
        }
    }
}

impl std::error::Error for BuildError {}

// ============================================================================
//  Purge
// ============================================================================

/// Anything that can drop all of its contents in one call.
///
/// A process-wide registry holds `Arc<dyn Purge>` handles to flush every
/// cache at once.
pub trait Purge: Send + Sync {
    /// Remove every element.
    fn purge(&self);
}

// ============================================================================
//  Root
// ============================================================================

/// Current root of a tree and the counters that belong to it.
///
/// Purge swaps the whole `Root`, so a store still working inside an
/// orphaned tree bumps the orphan's counter, never the live one.
pub(crate) struct Root<K, V> {
    pub(crate) node: NodeRef<K, V>,

    /// Levels from the root down to the leaves, inclusive.
    pub(crate) levels: usize,

    /// Number of entries reachable from `node`.
    pub(crate) len: Arc<AtomicUsize>,
}

impl<K, V> Root<K, V> {
    fn empty() -> Self {
        Self {
            node: Node::new_root_leaf(),
            levels: 1,
            len: Arc::new(AtomicUsize::new(0)),
        }
    }
}

// ============================================================================
//  BPTree
// ============================================================================

/// A concurrent, ordered, in-memory B+Tree.
///
/// Keys are ordered by the injected [`Comparator`]. All operations take
/// `&self`; share the tree between threads with `Arc`.
///
/// # Type Parameters
///
/// - `K` - Key type. Cloned when a split copies a key up as a separator.
/// - `V` - Value type. Cloned out on reads.
/// - `C` - Comparator, [`NaturalOrder`] by default.
///
/// # Example
///
/// ```rust
/// use bptree_cache::BPTree;
///
/// let tree: BPTree<u64, &str> = BPTree::with_ord("users", 3).unwrap();
/// tree.store(2, "b");
/// tree.store(1, "a");
/// tree.store(3, "c");
///
/// assert_eq!(tree.load(&2), Some("b"));
/// assert_eq!(tree.slice(&1, &2), vec!["a", "b"]);
/// assert_eq!(tree.reverse_slice(&3, &2), vec!["c", "b"]);
/// assert_eq!(tree.len(), 3);
/// ```
pub struct BPTree<K, V, C = NaturalOrder> {
    /// Registry name.
    name: String,

    /// Maximum fan-out. Nodes hold at most `order - 1` keys.
    order: usize,

    comparator: C,

    /// Short-held cell around the current root.
    root: RwLock<Root<K, V>>,
}

impl<K, V, C> StdFmt::Debug for BPTree<K, V, C> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        let (levels, len) = {
            let root = self.root.read();
            (root.levels, root.len.load(AtomicOrdering::Relaxed))
        };
        f.debug_struct("BPTree")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("levels", &levels)
            .field("len", &len)
            .finish_non_exhaustive()
    }
}

impl<K, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Create an empty tree ordered by `comparator`.
    ///
    /// # Errors
    ///
    /// [`BuildError::OrderTooSmall`] if `order < 2`.
    pub fn new(name: impl Into<String>, order: usize, comparator: C) -> Result<Self, BuildError> {
        if order < MIN_ORDER {
            return Err(BuildError::OrderTooSmall { order });
        }

        let name = name.into();
        debug_log!(name = %name, order, "creating tree");

        Ok(Self {
            name,
            order,
            comparator,
            root: RwLock::new(Root::empty()),
        })
    }
}

impl<K: Ord, V> BPTree<K, V, NaturalOrder> {
    /// Create an empty tree ordered by `K`'s [`Ord`] impl.
    ///
    /// # Errors
    ///
    /// [`BuildError::OrderTooSmall`] if `order < 2`.
    pub fn with_ord(name: impl Into<String>, order: usize) -> Result<Self, BuildError> {
        Self::new(name, order, NaturalOrder)
    }

    /// Create an empty tree with [`DEFAULT_ORDER`].
    #[must_use]
    pub fn with_default_order(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: DEFAULT_ORDER,
            comparator: NaturalOrder,
            root: RwLock::new(Root::empty()),
        }
    }
}

impl<V> BPTree<SystemTime, V, TimeOrder> {
    /// Create an empty tree keyed by wall-clock time.
    ///
    /// ```rust
    /// use std::time::{Duration, SystemTime};
    ///
    /// use bptree_cache::{BPTree, TimeOrder};
    ///
    /// let tree: BPTree<SystemTime, u32, TimeOrder> = BPTree::with_time("events", 8).unwrap();
    /// let t0 = SystemTime::UNIX_EPOCH;
    /// tree.store(t0 + Duration::from_secs(2), 2);
    /// tree.store(t0 + Duration::from_secs(1), 1);
    ///
    /// assert_eq!(tree.slice(&t0, &(t0 + Duration::from_secs(5))), vec![1, 2]);
    /// ```
    ///
    /// # Errors
    ///
    /// [`BuildError::OrderTooSmall`] if `order < 2`.
    pub fn with_time(name: impl Into<String>, order: usize) -> Result<Self, BuildError> {
        Self::new(name, order, TimeOrder)
    }
}

impl<K, V, C> BPTree<K, V, C> {
    /// The name this tree registers under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum fan-out.
    #[must_use]
    #[inline(always)]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// The comparator ordering the keys.
    #[must_use]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Number of distinct keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.read().len.load(AtomicOrdering::Acquire)
    }

    /// Whether the tree holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels, 1 for a tree whose root is a leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.read().levels
    }

    /// Drop every entry.
    ///
    /// The root is swapped for a fresh empty leaf. Operations already
    /// walking the old tree finish against it; anything started afterwards
    /// sees the empty tree.
    pub fn purge(&self) {
        let old = std::mem::replace(&mut *self.root.write(), Root::empty());
        debug_log!(
            name = %self.name,
            dropped = old.len.load(AtomicOrdering::Relaxed),
            "purged tree"
        );
        drop(old);
    }
}

impl<K, V, C> Purge for BPTree<K, V, C>
where
    K: Send + Sync,
    V: Send + Sync,
    C: Send + Sync,
{
    fn purge(&self) {
        Self::purge(self);
    }
}

impl<K: Clone, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Insert `key`, or overwrite its value if it is already present.
    pub fn store(&self, key: K, value: V) {
        if let Some((key, value)) = self.store_optimistic(key, value) {
            self.store_locked(key, value);
        }
    }
}

// ============================================================================
//  Tests
// ============================================================================
