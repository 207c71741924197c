//! Three-way key ordering injected into a [`BPTree`](crate::BPTree).
//!
//! The tree never calls `Ord` directly. Every key comparison goes through a
//! [`Comparator`], so a tree can be keyed by types with no natural order or
//! by types whose order differs from their `Ord` impl.

use std::cmp::Ordering;
use std::time::SystemTime;

/// A total order over keys of type `K`.
///
/// Implementations must be consistent: `compare(a, b)` must be the inverse of
/// `compare(b, a)`, and equal keys must compare [`Ordering::Equal`]. The tree
/// treats `Equal` as "same key" and updates in place.
pub trait Comparator<K: ?Sized>: Send + Sync {
    /// Compare `a` against `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Orders [`SystemTime`] keys chronologically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeOrder;

impl Comparator<SystemTime> for TimeOrder {
    fn compare(&self, a: &SystemTime, b: &SystemTime) -> Ordering {
        if a < b {
            Ordering::Less
        } else if a > b {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Inverts the wrapped comparator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reverse<C>(pub C);

impl<K: ?Sized, C: Comparator<K>> Comparator<K> for Reverse<C> {
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.0.compare(b, a)
    }
}
