//! Filepath: src/rng.rs
//!
//! RNG adapter: uniform integer draws over a closed range.
//!
//! The engine never constructs its own generator. Each rank injects
//! one, which keeps seeding policy with the caller: independent
//! entropy per rank for production use, `SeedableRng::seed_from_u64`
//! with distinct per-rank seeds for reproducible runs. Re-entering
//! the engine with the same generator continues its stream, so
//! repeated calls on one group stay independent.

use rand::Rng;

/// Source of independent uniform draws on one rank.
///
/// Implemented for every [`rand::Rng`], which is what callers will
/// use in practice; the trait exists so the engine can be driven by
/// a counting stub in tests.
pub trait UniformRng {
    /// Draw a uniform integer in the closed range `[lo, hi]`.
    ///
    /// Draws are independent across calls. `lo <= hi` is required.
    fn uniform_int(&mut self, lo: u64, hi: u64) -> u64;
}

impl<R: Rng> UniformRng for R {
    fn uniform_int(&mut self, lo: u64, hi: u64) -> u64 {
        self.random_range(lo..=hi)
    }
}
