//! Key search within a single node.
//!
//! Provides binary search for:
//! - Lower bound in leaves (finding keys or insertion points)
//! - Upper bound in internal nodes (routing to children)
//!
//! All comparisons go through the tree's [`Comparator`].

use std::cmp::Ordering;

use crate::comparator::Comparator;
use crate::entry::Entry;

// ============================================================================
//  KeyIndexPosition
// ============================================================================

/// Result of a leaf search.
///
/// `i` is the logical position of the key if it is present, or the position
/// at which it would be inserted to keep the leaf sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyIndexPosition {
    /// Logical position in sorted order.
    pub i: usize,

    /// Whether `i` holds an entry with an equal key.
    pub found: bool,
}

impl KeyIndexPosition {
    #[inline(always)]
    pub(crate) const fn found(i: usize) -> Self {
        Self { i, found: true }
    }

    #[inline(always)]
    pub(crate) const fn not_found(i: usize) -> Self {
        Self { i, found: false }
    }
}

// ============================================================================
//  Leaf search
// ============================================================================

/// Binary search for `key` among sorted leaf entries.
#[inline]
pub(crate) fn lower_bound_leaf<K, V, C>(
    entries: &[Entry<K, V>],
    key: &K,
    cmp: &C,
) -> KeyIndexPosition
where
    C: Comparator<K> + ?Sized,
{
    match entries.binary_search_by(|e| cmp.compare(e.key(), key)) {
        Ok(i) => KeyIndexPosition::found(i),
        Err(i) => KeyIndexPosition::not_found(i),
    }
}

// ============================================================================
//  Internal-node routing
// ============================================================================

/// Index of the child that covers `key`.
///
/// Separator `keys[i]` is the smallest key of `children[i + 1]`, so the
/// child index is the number of separators `<= key`. A key equal to a
/// separator therefore routes right.
#[inline]
pub(crate) fn upper_bound_internal<K, C>(keys: &[K], key: &K, cmp: &C) -> usize
where
    C: Comparator<K> + ?Sized,
{
    keys.partition_point(|sep| cmp.compare(sep, key) != Ordering::Greater)
}
