//! Stress tests for `BPTree` concurrent operations.
//!
//! These tests are designed to expose races and lock-order bugs through:
//! - Disjoint and interleaved writers splitting the same leaves
//! - Readers and range scans running while the tree grows
//! - Purge racing with writers
//! - Small orders, so nearly every insert splits something
//!
//! Run all stress tests:
//! ```bash
//! cargo test --test stress_tests --release
//! ```
//!
//! With library tracing:
//! ```bash
//! RUST_LOG=bptree_cache=debug cargo test --features tracing --test stress_tests
//! ```

#![allow(clippy::pedantic)]
#![expect(clippy::unwrap_used)]

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use bptree_cache::BPTree;

// =============================================================================
// Helpers
// =============================================================================

/// Verify all keys are loadable, panic with details if any missing
fn verify_all_keys(tree: &BPTree<u64, u64>, keys: impl IntoIterator<Item = u64>, test_name: &str) {
    let missing: Vec<u64> = keys.into_iter().filter(|k| tree.load(k) != Some(*k)).collect();

    if !missing.is_empty() {
        let sample: Vec<_> = missing.iter().take(20).collect();
        panic!(
            "{}: Missing {} keys (showing first 20): {:?}\n\
             tree.len()={}",
            test_name,
            missing.len(),
            sample,
            tree.len(),
        );
    }
}

fn run_writers<F>(threads: u64, tree: &Arc<BPTree<u64, u64>>, keys_for: F)
where
    F: Fn(u64) -> Vec<u64> + Send + Sync + 'static,
{
    let keys_for = Arc::new(keys_for);
    let barrier = Arc::new(Barrier::new(threads as usize));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let tree = Arc::clone(tree);
            let keys_for = Arc::clone(&keys_for);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let keys = keys_for(t);
                barrier.wait();
                for k in keys {
                    tree.store(k, k);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

// =============================================================================
// Concurrent Writers
// =============================================================================

/// N threads each storing M distinct keys: `len == N * M`, all loadable.
#[test]
fn disjoint_writers_8_threads() {
    common::init_tracing();

    const THREADS: u64 = 8;
    const KEYS_PER_THREAD: u64 = 2_000;

    for order in [2, 3, 4, 16] {
        let tree = Arc::new(BPTree::<u64, u64>::with_ord("disjoint", order).unwrap());
        run_writers(THREADS, &tree, |t| {
            (0..KEYS_PER_THREAD).map(|i| t * KEYS_PER_THREAD + i).collect()
        });

        assert_eq!(tree.len() as u64, THREADS * KEYS_PER_THREAD, "order {order}");
        verify_all_keys(&tree, 0..THREADS * KEYS_PER_THREAD, "disjoint_writers_8_threads");
        tree.validate().unwrap();
        tracing::info!(order, height = tree.height(), "disjoint writers done");
    }
}

/// Writers interleave keys so every leaf is contended.
#[test]
fn interleaved_writers_hit_the_same_leaves() {
    common::init_tracing();

    const THREADS: u64 = 8;
    const TOTAL: u64 = 16_000;

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("interleaved", 4).unwrap());
    run_writers(THREADS, &tree, |t| (0..TOTAL).filter(|k| k % THREADS == t).collect());

    assert_eq!(tree.len() as u64, TOTAL);
    verify_all_keys(&tree, 0..TOTAL, "interleaved_writers_hit_the_same_leaves");
    assert_eq!(tree.slice(&0, &TOTAL), (0..TOTAL).collect::<Vec<_>>());
    tree.validate().unwrap();
}

/// Every thread stores the same keys: no key is counted twice.
#[test]
fn overlapping_writers_count_each_key_once() {
    const THREADS: u64 = 8;
    const KEYS: u64 = 3_000;

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("overlap", 5).unwrap());
    run_writers(THREADS, &tree, |t| {
        let mut keys = common::shuffled(KEYS, t + 1);
        keys.rotate_left((t * 97) as usize);
        keys
    });

    assert_eq!(tree.len() as u64, KEYS);
    verify_all_keys(&tree, 0..KEYS, "overlapping_writers_count_each_key_once");
    tree.validate().unwrap();
}

// =============================================================================
// Mixed Readers / Scanners / Writers
// =============================================================================

/// Scans run while writers grow the tree. Every scan must be strictly
/// ascending (or descending) and contain every key that was present before
/// the writers started.
#[test]
fn scans_during_inserts_stay_sorted() {
    common::init_tracing();

    const PRELOAD: u64 = 2_000;
    const WRITERS: u64 = 4;
    const PER_WRITER: u64 = 5_000;

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("scans", 4).unwrap());
    // Even keys are present from the start; writers add odd keys.
    for k in 0..PRELOAD {
        tree.store(k * 2, k * 2);
    }

    let done = Arc::new(AtomicBool::new(false));
    let scans = Arc::new(AtomicUsize::new(0));

    let scanners: Vec<_> = (0..4)
        .map(|s| {
            let tree = Arc::clone(&tree);
            let done = Arc::clone(&done);
            let scans = Arc::clone(&scans);
            thread::spawn(move || {
                let preloaded: HashSet<u64> = (0..PRELOAD).map(|k| k * 2).collect();
                while !done.load(Ordering::Acquire) {
                    let values = if s % 2 == 0 {
                        tree.slice(&0, &u64::MAX)
                    } else {
                        let mut v = tree.reverse_slice(&u64::MAX, &0);
                        v.reverse();
                        v
                    };

                    assert!(
                        values.windows(2).all(|w| w[0] < w[1]),
                        "scan out of order"
                    );
                    let seen: HashSet<u64> = values.iter().copied().collect();
                    assert!(preloaded.is_subset(&seen), "scan missed a preloaded key");
                    scans.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for i in 0..PER_WRITER {
                    let k = (t * PER_WRITER + i) * 2 + 1;
                    tree.store(k, k);
                }
            })
        })
        .collect();

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for h in scanners {
        h.join().unwrap();
    }

    assert!(scans.load(Ordering::Relaxed) > 0);
    assert_eq!(tree.len() as u64, PRELOAD + WRITERS * PER_WRITER);
    tree.validate().unwrap();
}

/// Loads of preloaded keys never miss while other keys are inserted.
#[test]
fn loads_never_miss_during_splits() {
    const PRELOAD: u64 = 1_000;

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("loads", 3).unwrap());
    for k in 0..PRELOAD {
        tree.store(k * 10, k * 10);
    }

    let done = Arc::new(AtomicBool::new(false));
    let misses = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let tree = Arc::clone(&tree);
            let done = Arc::clone(&done);
            let misses = Arc::clone(&misses);
            thread::spawn(move || {
                let mut i = r;
                while !done.load(Ordering::Acquire) {
                    let k = (i % PRELOAD) * 10;
                    if tree.load(&k) != Some(k) {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                    i += 7;
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..4u64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for k in common::shuffled(PRELOAD * 10, t) {
                    if k % 10 != 0 {
                        tree.store(k, k);
                    }
                }
            })
        })
        .collect();

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for h in readers {
        h.join().unwrap();
    }

    assert_eq!(misses.load(Ordering::Relaxed), 0);
    assert_eq!(tree.len() as u64, PRELOAD * 10);
    tree.validate().unwrap();
}

/// Updates of existing keys race with inserts that split their leaves.
#[test]
fn updates_race_with_splits() {
    const KEYS: u64 = 2_000;

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("updates", 4).unwrap());
    for k in 0..KEYS {
        tree.store(k * 2, 0);
    }

    let updaters: Vec<_> = (0..4u64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for round in 1..=5 {
                    for k in 0..KEYS {
                        if k % 4 == t {
                            tree.store(k * 2, round);
                        }
                    }
                }
            })
        })
        .collect();

    let inserter = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for k in 0..KEYS {
                tree.store(k * 2 + 1, 1);
            }
        })
    };

    for h in updaters {
        h.join().unwrap();
    }
    inserter.join().unwrap();

    assert_eq!(tree.len() as u64, KEYS * 2);
    for k in 0..KEYS {
        assert_eq!(tree.load(&(k * 2)), Some(5), "update of {} lost", k * 2);
    }
    tree.validate().unwrap();
}

// =============================================================================
// Purge Under Load
// =============================================================================

/// Purge while writers are active: no deadlock, and once everything has
/// stopped the live tree is valid and its counter matches its contents.
#[test]
fn purge_races_with_writers() {
    common::init_tracing();

    let tree = Arc::new(BPTree::<u64, u64>::with_ord("purge", 4).unwrap());
    let barrier = Arc::new(Barrier::new(5));

    let writers: Vec<_> = (0..4u64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..5_000 {
                    tree.store(t * 5_000 + i, i);
                }
            })
        })
        .collect();

    barrier.wait();
    for _ in 0..20 {
        tree.purge();
        thread::yield_now();
    }

    for h in writers {
        h.join().unwrap();
    }

    let shape = tree.validate().unwrap();
    assert_eq!(shape.entries, tree.len());

    tree.purge();
    assert!(tree.is_empty());
    assert!(tree.slice(&0, &u64::MAX).is_empty());
}
