//! Leaf key/value slots.

use std::fmt as StdFmt;

use parking_lot::RwLock;

/// One key/value slot in a leaf.
///
/// The key is fixed at creation. The value sits behind its own lock so an
/// update of an existing key only needs a shared lock on the owning leaf.
pub(crate) struct Entry<K, V> {
    key: K,
    value: RwLock<V>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) const fn new(key: K, value: V) -> Self {
        Self {
            key,
            value: RwLock::new(value),
        }
    }

    #[inline(always)]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    /// Replace the value, returning the previous one.
    pub(crate) fn store(&self, value: V) -> V {
        std::mem::replace(&mut *self.value.write(), value)
    }
}

impl<K, V: Clone> Entry<K, V> {
    /// Clone the value out under a shared lock.
    pub(crate) fn load(&self) -> V {
        self.value.read().clone()
    }
}

impl<K: StdFmt::Debug, V: StdFmt::Debug> StdFmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &*self.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_returns_previous_value() {
        let entry = Entry::new(1u32, "a".to_string());
        assert_eq!(entry.store("b".to_string()), "a");
        assert_eq!(entry.load(), "b");
        assert_eq!(*entry.key(), 1);
    }
}
