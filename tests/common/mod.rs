//! Shared helpers for integration tests: tracing setup and key generation.
//!
//! # Tracing
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ...
//! }
//! ```
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `bptree_cache=debug,stress_tests=info`)
//! - `BPTREE_LOG_FILE`: Also write NDJSON events to this path
//!
//! Library events are only emitted when the crate is built with the
//! `tracing` feature; test-side events are always recorded.
//!
//! ```bash
//! RUST_LOG=bptree_cache=debug BPTREE_LOG_FILE=logs/bptree.jsonl \
//!     cargo test --features tracing --test stress_tests
//! cat logs/bptree.jsonl | jq 'select(.fields.message | test("split"))'
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once per test binary.
static INIT: Once = Once::new();

/// Install the test subscriber. Safe to call from every test.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

fn make_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn setup_tracing() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_thread_ids(true)
        .with_target(true)
        .compact()
        .with_filter(make_filter());

    // Parallel test threads share the file, so append.
    let file_layer = env::var_os("BPTREE_LOG_FILE")
        .map(PathBuf::from)
        .and_then(|path| {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).ok()?;
            }
            OpenOptions::new().create(true).append(true).open(path).ok()
        })
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_thread_ids(true)
                .with_span_events(FmtSpan::CLOSE)
                .json()
                .with_filter(make_filter())
        });

    // try_init: another harness may already have installed a subscriber.
    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Deterministic permutation of `0..n` (Fisher-Yates over an LCG).
pub fn shuffled(n: u64, seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n).collect();
    let mut state = seed;

    for i in (1..keys.len()).rev() {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let j = ((state >> 33) as usize) % (i + 1);
        keys.swap(i, j);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffled_is_a_permutation() {
        let mut keys = shuffled(1000, 7);
        assert_ne!(keys, (0..1000).collect::<Vec<_>>());
        keys.sort_unstable();
        assert_eq!(keys, (0..1000).collect::<Vec<_>>());
    }
}
