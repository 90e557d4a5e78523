//! Collective transport contract consumed by the engine.
//!
//! The engine is written against this trait, not against any concrete
//! messaging layer. [`LocalGroup`](crate::local::LocalGroup) provides
//! the in-process implementation; an MPI-style binding would satisfy
//! the same contract.
//!
//! # Delivery model
//!
//! Messages between one (sender, receiver) pair are delivered FIFO,
//! across tags: a message enqueued before another by the same sender
//! is matched first when both are eligible. No ordering is assumed
//! across different senders. The substrate is reliable; there are no
//! retries and no timeouts, and any primitive failure is fatal to the
//! calling operation.

use crate::error::Result;

/// Tag for a Phase 3 slice announcement: `[firstp, countp]`.
pub const TAG_HEADER: u16 = 1;

/// Tag for the Phase 3 slice elements themselves.
pub const TAG_PAYLOAD: u16 = 2;

/// First tag reserved for a transport's internal collectives.
/// User-level point-to-point traffic must stay below this value.
pub const RESERVED_TAG_BASE: u16 = 16;

/// A fixed process group carrying `u64` payloads.
///
/// All collectives are group-wide suspension points: every rank must
/// enter them, in the same order, with compatible arguments. Ranks
/// with nothing to contribute still participate with zero-length
/// contributions. No concurrent collective on the same group is
/// permitted.
pub trait Group {
    /// Proof that a [`send_async`](Group::send_async) was issued.
    /// Retained by the caller and redeemed via
    /// [`wait_all`](Group::wait_all).
    type SendToken;

    /// This rank's identifier, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group. At least 1 by construction.
    fn size(&self) -> usize;

    /// Fixed-size all-to-all: `sendcounts[j]` goes to rank `j`;
    /// the result holds one value received from each rank, indexed
    /// by source.
    ///
    /// `sendcounts.len()` must equal `size()`.
    fn exchange_counts(&self, sendcounts: &[u64]) -> Result<Vec<u64>>;

    /// Variable all-to-all. `packed` is contiguous in destination
    /// rank order with per-destination lengths `sendcounts`; the
    /// result is contiguous in source rank order with lengths
    /// `recvcounts`. Displacements are the prefix sums of the counts
    /// on both sides.
    fn exchange_values(
        &self,
        packed: &[u64],
        sendcounts: &[u64],
        recvcounts: &[u64],
    ) -> Result<Vec<u64>>;

    /// Inclusive prefix sum over ranks: returns the sum of `value`
    /// contributions from ranks `0..=rank()`.
    fn scan_sum(&self, value: u64) -> Result<u64>;

    /// Non-blocking tagged send. The payload is captured at call
    /// time; completion is observed through
    /// [`wait_all`](Group::wait_all). `tag` must be below
    /// [`RESERVED_TAG_BASE`].
    fn send_async(&self, dest: usize, tag: u16, payload: &[u64]) -> Result<Self::SendToken>;

    /// Blocking receive with a source wildcard: the first eligible
    /// message carrying `tag`, from any rank. Returns the source.
    fn recv_any(&self, tag: u16) -> Result<(usize, Vec<u64>)>;

    /// Blocking receive of the first eligible message carrying `tag`
    /// from the given rank.
    fn recv_from(&self, src: usize, tag: u16) -> Result<Vec<u64>>;

    /// Wait for every outstanding send represented by `tokens`.
    fn wait_all(&self, tokens: Vec<Self::SendToken>) -> Result<()>;

    /// Group-wide barrier.
    fn barrier(&self) -> Result<()>;
}
