//! Common test utilities: tracing setup and group harness helpers.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let blocks = common::run_permute(100, 4, 7);
//!     // ...
//! }
//! ```
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (e.g. `paraperm=debug`)
//! - `PARAPERM_LOG_DIR`: if set, NDJSON logs are also written to
//!   `<dir>/paraperm.json`

#![allow(dead_code)]

use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Once;
use std::thread;

use paraperm::{LocalGroup, permute};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Initialize the tracing subscriber with console and optional file
/// logging. Safe to call multiple times; only the first call takes
/// effect.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

fn make_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn setup_tracing() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true)
        .compact()
        .with_filter(make_filter());

    let file_layer = env::var("PARAPERM_LOG_DIR").ok().map(|dir| {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir).expect("failed to create log directory");
        let file = File::create(dir.join("paraperm.json")).expect("failed to create log file");
        // Leaked to get the 'static lifetime the writer closure needs.
        let file: &'static File = Box::leak(Box::new(file));
        tracing_subscriber::fmt::layer()
            .with_writer(move || file)
            .with_thread_ids(true)
            .json()
            .with_filter(make_filter())
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Golden-ratio mixer: per-rank seeds derived from one base seed
/// share no structure across ranks.
pub const SEED_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-rank seed for a given base seed.
pub fn rank_seed(base: u64, rank: usize) -> u64 {
    base ^ (rank as u64 + 1).wrapping_mul(SEED_MULTIPLIER)
}

/// Run `permute(n)` across `p` in-process ranks, each seeded from
/// `base_seed`, and return the per-rank blocks in rank order.
pub fn run_permute(n: u64, p: usize, base_seed: u64) -> Vec<Vec<u64>> {
    let groups = LocalGroup::split(p).expect("group construction failed");
    thread::scope(|s| {
        let handles: Vec<_> = groups
            .into_iter()
            .enumerate()
            .map(|(rank, group)| {
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(rank_seed(base_seed, rank));
                    permute(n, &group, &mut rng).expect("permute failed")
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("rank panicked")).collect()
    })
}

/// Assert the blocks form a valid output for `(n, p)`: coverage,
/// block sizes, and value range (T1, T2, T3).
pub fn assert_valid_output(blocks: &[Vec<u64>], n: u64, p: usize) {
    assert_eq!(blocks.len(), p, "one block per rank expected");

    let m = n.div_ceil(p as u64);
    for (rank, block) in blocks.iter().enumerate() {
        let pos = rank as u64 * m;
        let expected = if pos >= n { 0 } else { m.min(n - pos) };
        assert_eq!(
            block.len() as u64,
            expected,
            "rank {rank} block size wrong for n={n}, p={p}"
        );
        for &v in block {
            assert!(v < n, "value {v} out of range on rank {rank}");
        }
    }

    let mut all: Vec<u64> = blocks.iter().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all.len() as u64, n, "concatenation must have n elements");
    for (i, &v) in all.iter().enumerate() {
        assert_eq!(v, i as u64, "index {i} missing or duplicated");
    }
}
