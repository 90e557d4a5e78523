//! Fast benchmarks for the permutation engine using Divan.
//!
//! Run with: `cargo bench --bench permute`

use divan::{Bencher, black_box};
use paraperm::{LocalGroup, permute};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::thread;

fn main() {
    divan::main();
}

/// One full permute across `p` in-process ranks.
fn run(n: u64, p: usize) -> Vec<Vec<u64>> {
    let groups = LocalGroup::split(p).unwrap();
    thread::scope(|s| {
        let handles: Vec<_> = groups
            .into_iter()
            .enumerate()
            .map(|(rank, group)| {
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(rank as u64 + 1);
                    permute(n, &group, &mut rng).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

// =============================================================================
// Single rank: pure engine throughput, no cross-rank traffic
// =============================================================================

#[divan::bench_group]
mod single_rank {
    use super::{Bencher, LocalGroup, StdRng, black_box, permute};
    use rand::SeedableRng;

    #[divan::bench(args = [1_000, 100_000, 1_000_000])]
    fn permute_n(bencher: Bencher, n: u64) {
        let groups = LocalGroup::split(1).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        bencher.bench_local(|| permute(black_box(n), &groups[0], &mut rng).unwrap());
    }
}

// =============================================================================
// Multi rank: thread spawn + collectives included
// =============================================================================

#[divan::bench_group]
mod multi_rank {
    use super::{Bencher, black_box, run};

    #[divan::bench(args = [2, 4, 8])]
    fn permute_100k(bencher: Bencher, p: usize) {
        bencher.bench_local(|| run(black_box(100_000), p));
    }

    #[divan::bench(args = [2, 4])]
    fn permute_1m(bencher: Bencher, p: usize) {
        bencher.bench_local(|| run(black_box(1_000_000), p));
    }
}
