//! Filepath: src/engine.rs
//!
//! The three-phase distributed permutation engine.
//!
//! Every rank of a fixed group runs [`permute`] simultaneously
//! (SPMD). Rank `r` comes back holding a contiguous block of a
//! permutation of `0..n` that is uniform over the whole symmetric
//! group, without the full sequence ever existing on one rank:
//!
//! 1. **Scatter**: each owned index is routed to an independently
//!    uniform random rank through one variable all-to-all.
//! 2. **Shuffle**: each rank runs Fisher-Yates over whatever the
//!    scatter delivered to it.
//! 3. **Redistribute**: a prefix scan over the local sizes assigns
//!    each rank's shuffled run a window of global positions; slices
//!    of that run are pushed back to the canonical block owners with
//!    tagged point-to-point messages.
//!
//! The scatter makes the multiset landing on each rank independent of
//! index values; the local shuffles then pick a uniform arrangement
//! within each landing zone, and the concatenation in rank order is a
//! uniform permutation. Redistribution only re-blocks that sequence.

use crate::error::{Error, Result};
use crate::layout::BlockLayout;
use crate::rng::UniformRng;
use crate::tracing_helpers::{debug_log, trace_log};
use crate::transport::{Group, TAG_HEADER, TAG_PAYLOAD};

/// Generate this rank's block of a uniform random permutation of
/// `0..n`.
///
/// Must be entered by every rank of `group` with the same `n`;
/// mismatched `n` across ranks is a programming error with undefined
/// results. `rng` is this rank's private draw source and must be
/// seeded independently per rank, or the scatter destinations
/// correlate across ranks and the result is no longer uniform.
///
/// On success, rank `r` holds positions `[r * m, r * m + count)` of
/// the permutation, `m = ceil(n / P)`; concatenating the returned
/// blocks in rank order yields the full permutation.
///
/// # Errors
///
/// Input errors ([`Error::EmptyGroup`], [`Error::IndexOverflow`]) are
/// surfaced before any collective is entered. Transport failures and
/// defensive invariant trips are fatal to the call; no partial result
/// is returned and no recovery is attempted.
pub fn permute<G: Group, R: UniformRng>(n: u64, group: &G, rng: &mut R) -> Result<Vec<u64>> {
    let layout = BlockLayout::new(n, group.size(), group.rank())?;
    debug_log!(
        rank = group.rank(),
        n,
        count = layout.count,
        "permute: layout fixed"
    );

    let mut landed = scatter(&layout, group, rng)?;
    shuffle(&mut landed, rng);
    group.barrier()?;
    debug_log!(rank = group.rank(), landed = landed.len(), "permute: local shuffle done");

    redistribute(&landed, &layout, group)
}

/// Phase 1: route every owned index to a uniformly drawn rank.
///
/// Owned indices are packed by destination in a single counting pass
/// and exchanged through the two all-to-alls. A rank with nothing to
/// send still enters both collectives with zero counts. Returns the
/// multiset of indices whose draw selected this rank, in arbitrary
/// order.
fn scatter<G: Group, R: UniformRng>(
    layout: &BlockLayout,
    group: &G,
    rng: &mut R,
) -> Result<Vec<u64>> {
    let p = group.size();
    let count = layout.count as usize;

    let mut dests = Vec::with_capacity(count);
    let mut sendcounts = vec![0u64; p];
    for _ in 0..count {
        let dest = rng.uniform_int(0, p as u64 - 1) as usize;
        dests.push(dest);
        sendcounts[dest] += 1;
    }

    // Pack values contiguously in destination order. Cursor per
    // destination starts at that destination's displacement.
    let mut cursors: Vec<usize> = Vec::with_capacity(p);
    let mut offset = 0usize;
    for &c in &sendcounts {
        cursors.push(offset);
        offset += c as usize;
    }
    let mut packed = vec![0u64; count];
    for (k, &dest) in dests.iter().enumerate() {
        packed[cursors[dest]] = layout.pos + k as u64;
        cursors[dest] += 1;
    }

    let recvcounts = group.exchange_counts(&sendcounts)?;
    let landed = group.exchange_values(&packed, &sendcounts, &recvcounts)?;
    group.barrier()?;
    Ok(landed)
}

/// Phase 2: Fisher-Yates over the locally landed indices.
///
/// Swaps position `k` with a uniform draw in `[0, k]` for `k`
/// descending. Buffers of length 0 or 1 are left unchanged.
fn shuffle<R: UniformRng>(buffer: &mut [u64], rng: &mut R) {
    for k in (1..buffer.len()).rev() {
        let l = rng.uniform_int(0, k as u64) as usize;
        buffer.swap(k, l);
    }
}

/// Phase 3: deliver each shuffled element to its canonical owner.
///
/// The scan places this rank's buffer at global positions
/// `[first, first + total)` of the concatenated shuffled sequence.
/// The walk cuts that window at block boundaries and ships each cut
/// to its owner as a HEADER/PAYLOAD pair; the receive loop fills the
/// output block until no positions remain, then the retained sends
/// are drained and the group synchronises.
fn redistribute<G: Group>(buffer: &[u64], layout: &BlockLayout, group: &G) -> Result<Vec<u64>> {
    let rank = group.rank();
    let total = buffer.len() as u64;

    let first = group.scan_sum(total)? - total;

    let mut out = vec![0u64; layout.count as usize];
    let mut remains = layout.count;
    let mut tokens = Vec::new();

    if total > 0 {
        let last = first + total - 1;
        let mut owner = layout.owner_of(first);
        let mut firstp = first;

        // The final slice can end exactly at `last`; iterating while
        // firstp <= last keeps it.
        while firstp <= last {
            let lastp = layout.raw_block_end(owner).min(last);
            let countp = lastp - firstp + 1;
            let at = (firstp - first) as usize;
            let slice = &buffer[at..at + countp as usize];

            if owner == rank {
                let dst = (firstp - layout.pos) as usize;
                out[dst..dst + slice.len()].copy_from_slice(slice);
                remains = sub_remains(remains, countp)?;
                trace_log!(rank, firstp, countp, "slice kept locally");
            } else {
                tokens.push(group.send_async(owner, TAG_HEADER, &[firstp, countp])?);
                tokens.push(group.send_async(owner, TAG_PAYLOAD, slice)?);
                trace_log!(rank, owner, firstp, countp, "slice sent");
            }

            firstp = lastp + 1;
            owner += 1;
        }
    }

    while remains > 0 {
        let (src, header) = group.recv_any(TAG_HEADER)?;
        let &[firstp, countp] = header.as_slice() else {
            return Err(Error::protocol(format!(
                "header from rank {src} has {} words, expected 2",
                header.len()
            )));
        };

        let payload = group.recv_from(src, TAG_PAYLOAD)?;
        if payload.len() as u64 != countp {
            return Err(Error::protocol(format!(
                "payload from rank {src} has {} values, header announced {countp}",
                payload.len()
            )));
        }

        let dst = firstp
            .checked_sub(layout.pos)
            .ok_or_else(|| Error::protocol(format!("slice at {firstp} precedes owned block")))?
            as usize;
        let end = dst + payload.len();
        if end > out.len() {
            return Err(Error::protocol(format!(
                "slice at {firstp} overruns owned block"
            )));
        }
        out[dst..end].copy_from_slice(&payload);
        remains = sub_remains(remains, countp)?;
        trace_log!(rank, src, firstp, countp, remains, "slice received");
    }

    group.wait_all(tokens)?;
    group.barrier()?;
    Ok(out)
}

/// Decrement the missing-element counter, trapping underflow.
fn sub_remains(remains: u64, countp: u64) -> Result<u64> {
    remains
        .checked_sub(countp)
        .ok_or_else(|| Error::protocol("more elements delivered than owned".to_string()))
}
