//! Structural validation for tests and debugging.
//!
//! [`BPTree::validate`] walks the whole tree and checks every structural
//! invariant: balanced depth, ordering, separator bounds, fill limits, the
//! leaf sibling chain and the entry counter.
//!
//! # Quiescence Requirements
//!
//! Only meaningful while no writer is active. The walk takes shared locks
//! and cannot deadlock with writers, but a concurrent split can make it
//! report a violation that does not exist once the split completes.

use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::sync::Arc;
use std::sync::atomic::Ordering as AtomicOrdering;

use crate::comparator::Comparator;
use crate::entry::Entry;
use crate::node::{Node, NodeRef};

use super::BPTree;

/// Summary of a tree that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeShape {
    /// Levels from root to leaves, inclusive.
    pub height: usize,

    /// Number of leaves.
    pub leaves: usize,

    /// Number of internal nodes.
    pub internodes: usize,

    /// Number of entries across all leaves.
    pub entries: usize,
}

/// A broken structural invariant found by [`BPTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Leaves at different depths.
    UnbalancedLeaf {
        /// Depth of the first leaf found.
        expected: usize,
        /// Depth of the offending leaf.
        found: usize,
    },

    /// Keys inside a node are not strictly ascending.
    UnorderedKeys {
        /// Depth of the node (root = 1).
        depth: usize,
    },

    /// A key lies outside the range its parent's separators allow.
    SeparatorBound {
        /// Depth of the node holding the key.
        depth: usize,
    },

    /// A node holds more than `order - 1` keys.
    Overfull {
        /// Depth of the node.
        depth: usize,
        /// Keys held.
        nkeys: usize,
        /// Tree order.
        order: usize,
    },

    /// An internode does not have exactly one more child than keys.
    ChildCount {
        /// Depth of the node.
        depth: usize,
        /// Separator count.
        keys: usize,
        /// Child count.
        children: usize,
    },

    /// An internode's recorded height disagrees with its position.
    HeightMismatch {
        /// Depth of the node.
        depth: usize,
    },

    /// The sibling links do not match the in-order leaf sequence.
    BrokenSiblingChain {
        /// Position of the leaf in key order.
        leaf: usize,
    },

    /// The root cell's level count disagrees with the actual depth.
    LevelMismatch {
        /// Levels recorded in the root cell.
        recorded: usize,
        /// Levels found by walking.
        actual: usize,
    },

    /// The entry counter disagrees with the number of entries found.
    LengthMismatch {
        /// Value of the counter.
        recorded: usize,
        /// Entries found in leaves.
        actual: usize,
    },
}

impl StdFmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::UnbalancedLeaf { expected, found } => {
                write!(f, "leaf at depth {found}, expected {expected}")
            }
            Self::UnorderedKeys { depth } => write!(f, "keys out of order at depth {depth}"),
            Self::SeparatorBound { depth } => {
                write!(f, "key outside separator bounds at depth {depth}")
            }
            Self::Overfull {
                depth,
                nkeys,
                order,
            } => write!(f, "node at depth {depth} holds {nkeys} keys with order {order}"),
            Self::ChildCount {
                depth,
                keys,
                children,
            } => write!(f, "internode at depth {depth} has {keys} keys but {children} children"),
            Self::HeightMismatch { depth } => {
                write!(f, "internode at depth {depth} records the wrong height")
            }
            Self::BrokenSiblingChain { leaf } => {
                write!(f, "sibling links broken around leaf {leaf}")
            }
            Self::LevelMismatch { recorded, actual } => {
                write!(f, "root records {recorded} levels, found {actual}")
            }
            Self::LengthMismatch { recorded, actual } => {
                write!(f, "counter says {recorded} entries, found {actual}")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Accumulated state of one validation walk.
struct Walk<K, V> {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeRef<K, V>>,
    internodes: usize,
    entries: usize,
}

impl<K, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Check every structural invariant of the tree.
    ///
    /// # Errors
    ///
    /// The first [`InvariantViolation`] found.
    pub fn validate(&self) -> Result<TreeShape, InvariantViolation> {
        let (root, levels, recorded_len) = {
            let cell = self.root.read();
            (
                Arc::clone(&cell.node),
                cell.levels,
                cell.len.load(AtomicOrdering::Acquire),
            )
        };

        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            internodes: 0,
            entries: 0,
        };
        self.check_node(&root, 1, None, None, &mut walk)?;

        let actual = walk.leaf_depth.unwrap_or(1);
        if actual != levels {
            return Err(InvariantViolation::LevelMismatch {
                recorded: levels,
                actual,
            });
        }

        Self::check_chain(&walk.leaves)?;

        if walk.entries != recorded_len {
            return Err(InvariantViolation::LengthMismatch {
                recorded: recorded_len,
                actual: walk.entries,
            });
        }

        Ok(TreeShape {
            height: actual,
            leaves: walk.leaves.len(),
            internodes: walk.internodes,
            entries: walk.entries,
        })
    }

    /// Every key in `node` must lie in `[lower, upper)`.
    fn check_node(
        &self,
        node: &NodeRef<K, V>,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        walk: &mut Walk<K, V>,
    ) -> Result<(), InvariantViolation> {
        let guard = node.read();

        if guard.nkeys() >= self.order {
            return Err(InvariantViolation::Overfull {
                depth,
                nkeys: guard.nkeys(),
                order: self.order,
            });
        }

        match &*guard {
            Node::Leaf(leaf) => {
                let keys: Vec<&K> = leaf.entries().iter().map(Entry::key).collect();
                self.check_keys(&keys, depth, lower, upper)?;

                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(InvariantViolation::UnbalancedLeaf {
                            expected,
                            found: depth,
                        });
                    }
                    Some(_) => {}
                }

                walk.entries += leaf.size();
                walk.leaves.push(Arc::clone(node));
            }
            Node::Internal(inode) => {
                walk.internodes += 1;

                let keys: Vec<&K> = inode.keys().iter().collect();
                self.check_keys(&keys, depth, lower, upper)?;

                if inode.children().len() != inode.nkeys() + 1 {
                    return Err(InvariantViolation::ChildCount {
                        depth,
                        keys: inode.nkeys(),
                        children: inode.children().len(),
                    });
                }

                for (i, child) in inode.children().iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { keys.get(i - 1).copied() };
                    let child_upper = keys.get(i).copied().or(upper);

                    let expected_levels = inode.height() as usize + 1;
                    if child.read().levels() != expected_levels {
                        return Err(InvariantViolation::HeightMismatch { depth });
                    }

                    self.check_node(child, depth + 1, child_lower, child_upper, walk)?;
                }
            }
        }

        Ok(())
    }

    fn check_keys(
        &self,
        keys: &[&K],
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> Result<(), InvariantViolation> {
        let cmp = &self.comparator;

        if keys
            .windows(2)
            .any(|w| cmp.compare(w[0], w[1]) != Ordering::Less)
        {
            return Err(InvariantViolation::UnorderedKeys { depth });
        }

        let below = |k: &K| lower.is_some_and(|lo| cmp.compare(k, lo) == Ordering::Less);
        let above = |k: &K| upper.is_some_and(|hi| cmp.compare(k, hi) != Ordering::Less);
        if keys.iter().any(|k| below(k) || above(k)) {
            return Err(InvariantViolation::SeparatorBound { depth });
        }

        Ok(())
    }

    /// The sibling chain must link the leaves exactly in key order.
    fn check_chain(leaves: &[NodeRef<K, V>]) -> Result<(), InvariantViolation> {
        for (i, node) in leaves.iter().enumerate() {
            let linked = node.read().as_leaf().is_some_and(|leaf| {
                let left_ok = i
                    .checked_sub(1)
                    .and_then(|p| leaves.get(p))
                    .map_or_else(|| !leaf.has_left(), |prev| leaf.left_is(prev));
                let right_ok = leaves
                    .get(i + 1)
                    .map_or_else(|| !leaf.has_right(), |next| leaf.right_is(next));
                left_ok && right_ok
            });

            if !linked {
                return Err(InvariantViolation::BrokenSiblingChain { leaf: i });
            }
        }

        Ok(())
    }
}
