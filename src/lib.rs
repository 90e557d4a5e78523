//! # Paraperm
//!
//! Distributed generation of uniform random permutations, after
//! Sanders and the Paraperm elaboration of Langr et al.
//!
//! A fixed group of P ranks cooperates to permute `0..n` so that on
//! completion each rank holds one contiguous block of the result.
//! The full sequence never exists on a single rank; the only group
//! traffic is two all-to-alls, a prefix scan, and the tagged
//! point-to-point slices of the final re-blocking.
//!
//! ## Design
//!
//! The engine is a single stateless procedure run in SPMD fashion:
//! - Phase 1 scatters every owned index to an independently uniform
//!   random rank.
//! - Phase 2 Fisher-Yates-shuffles whatever landed locally.
//! - Phase 3 re-blocks the (conceptually concatenated) shuffled
//!   sequence back onto canonical owners, driven by a prefix scan.
//!
//! The transport is a trait ([`Group`]); [`LocalGroup`] implements it
//! in-process with one thread per rank, which is how the test suites
//! and the demo binary drive the engine. Seeding is injected: each
//! rank passes its own generator, seeded independently.
//!
//! ## Example
//!
//! ```rust,ignore
//! use paraperm::{permute, LocalGroup};
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let handles = LocalGroup::split(4)?;
//! std::thread::scope(|s| {
//!     for group in handles {
//!         s.spawn(move || {
//!             let mut rng = StdRng::seed_from_u64(0xA5 ^ group.rank() as u64);
//!             let block = permute(1 << 20, &group, &mut rng)?;
//!             // block is this rank's contiguous slice of the result
//!             Ok::<_, paraperm::Error>(())
//!         });
//!     }
//! });
//! ```

pub mod engine;
pub mod error;
pub mod layout;
pub mod local;
pub mod rng;
pub mod transport;

mod tracing_helpers;

pub use engine::permute;
pub use error::{Error, Result};
pub use layout::BlockLayout;
pub use local::LocalGroup;
pub use rng::UniformRng;
pub use transport::{Group, RESERVED_TAG_BASE, TAG_HEADER, TAG_PAYLOAD};
