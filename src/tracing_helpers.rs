//! Logging macros for the tree's write paths.
//!
//! `debug_log!` marks structural changes: tree creation, leaf and internode
//! splits, root growth and purge. `trace_log!` marks the per-operation
//! decisions: an optimistic store falling back to the locked path, how many
//! ancestors the locked path still holds at the leaf, a descent retrying
//! because the root was replaced, and a reverse scan correcting for a split
//! of its left neighbour.
//!
//! With the `tracing` feature the macros forward to `tracing`; without it
//! they expand to nothing and their arguments are never evaluated.
//!
//! ```bash
//! RUST_LOG=bptree_cache::tree::split=debug \
//!     cargo test --features tracing --test stress_tests
//! ```

#![allow(unused_macros, unused_imports)]

/// Per-operation decisions.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Structural changes.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
