//! # `BPTree`
//!
//! A concurrent, ordered, in-memory B+Tree used as a cache backend.
//!
//! Unlike a mutex-guarded hash map, the tree keeps its keys sorted under
//! an injected comparator and serves range scans in both directions while
//! readers and writers run in parallel.
//!
//! | Feature | Status |
//! |---------|--------|
//! | Concurrent load | Works (shared lock coupling) |
//! | Concurrent store | Works (optimistic leaf path + locked fallback) |
//! | Split propagation | Works (leaf and internode, root growth) |
//! | Range scans | Works (ascending and descending, over the leaf chain) |
//! | Purge | Works (root swap) |
//! | Deletion | Not provided |
//!
//! ## Thread Safety
//!
//! `BPTree<K, V, C>` is `Send + Sync` when `K`, `V` and `C` are. Every
//! operation takes `&self`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use bptree_cache::BPTree;
//!
//! let tree = Arc::new(BPTree::<u64, u64>::with_ord("scores", 8).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let tree = Arc::clone(&tree);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 tree.store(t * 100 + i, i);
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(tree.len(), 400);
//! assert_eq!(tree.slice(&0, &2), vec![0, 1, 2]);
//! ```
//!
//! ## Design
//!
//! Each node lives in its own `Arc<RwLock<_>>`. Internodes own their
//! children; leaves are chained by `Weak` sibling links, so there are no
//! ownership cycles. Readers couple shared locks top-down. Writers first
//! try an optimistic path that holds only an upgradable lock on the leaf,
//! and fall back to exclusive lock coupling when the leaf has to split. See
//! [`tree`] for the locking rules.
//!
//! ## Logging
//!
//! Enable the `tracing` feature to emit split, root growth and purge
//! events through the `tracing` crate. Without it, logging compiles away.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

pub mod comparator;
mod entry;
mod internode;
mod ksearch;
mod leaf;
mod node;
mod tracing_helpers;
pub mod tree;

// Re-export main types for convenience
pub use comparator::{Comparator, NaturalOrder, Reverse, TimeOrder};
pub use tree::{BPTree, BuildError, DEFAULT_ORDER, InvariantViolation, MIN_ORDER, Purge, TreeShape};
