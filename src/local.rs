//! Filepath: src/local.rs
//!
//! In-process process group: one mailbox per rank, threads as ranks.
//!
//! [`LocalGroup`] implements the [`Group`] contract for SPMD code
//! running as OS threads inside one process. Each rank owns a mailbox
//! (a queue under a `parking_lot` mutex with a condvar); sends copy
//! the payload into the destination mailbox and complete immediately,
//! receives scan the queue front-to-back for the first matching
//! envelope and otherwise block on the condvar. Taking the *first*
//! match per (tag, source) is what preserves pairwise FIFO delivery.
//!
//! Collectives are layered on the same mailboxes with reserved tags:
//! the all-to-alls as P-1 pairwise sends plus a local copy, the
//! prefix scan as a linear chain from rank 0 upward, the barrier via
//! a shared [`std::sync::Barrier`].
//!
//! There are no timeouts. A rank that exits without completing the
//! group's schedule leaves its peers blocked, which matches the
//! reliable-substrate assumption the engine is written against.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::tracing_helpers::trace_log;
use crate::transport::{Group, RESERVED_TAG_BASE};

/// Internal tag for count exchange rounds.
const TAG_COUNTS: u16 = RESERVED_TAG_BASE;
/// Internal tag for value exchange rounds.
const TAG_VALUES: u16 = RESERVED_TAG_BASE + 1;
/// Internal tag for the scan chain.
const TAG_SCAN: u16 = RESERVED_TAG_BASE + 2;

/// One in-flight message.
struct Envelope {
    src: usize,
    tag: u16,
    data: Vec<u64>,
}

/// Single-consumer mailbox. Only the owning rank receives from it;
/// any rank may post to it.
struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    ready: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }
}

/// State shared by every handle of one group.
struct Shared {
    mailboxes: Vec<Mailbox>,
    gate: Barrier,
}

/// One rank's handle onto an in-process group.
///
/// Created in bulk by [`LocalGroup::split`]; each handle is moved
/// into the thread that plays its rank.
///
/// # Example
///
/// ```rust,ignore
/// let handles = LocalGroup::split(4)?;
/// std::thread::scope(|s| {
///     for group in handles {
///         s.spawn(move || run_rank(group));
///     }
/// });
/// ```
pub struct LocalGroup {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Create a group of `p` ranks, returning one handle per rank in
    /// rank order.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyGroup`] when `p == 0`.
    pub fn split(p: usize) -> Result<Vec<Self>> {
        if p == 0 {
            return Err(Error::EmptyGroup);
        }

        let shared = Arc::new(Shared {
            mailboxes: (0..p).map(|_| Mailbox::new()).collect(),
            gate: Barrier::new(p),
        });

        Ok((0..p)
            .map(|rank| Self {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// Post an envelope into `dest`'s mailbox. Used by both user
    /// sends and the internal collectives.
    fn post(&self, dest: usize, tag: u16, data: Vec<u64>) -> Result<()> {
        let mbox = self
            .shared
            .mailboxes
            .get(dest)
            .ok_or_else(|| Error::transport("send", format!("destination rank {dest} out of range")))?;

        let mut queue = mbox.queue.lock();
        queue.push_back(Envelope {
            src: self.rank,
            tag,
            data,
        });
        drop(queue);
        mbox.ready.notify_all();
        Ok(())
    }

    /// Block until an envelope matching `(tag, src)` is available and
    /// take the first such match out of the queue.
    fn take_match(&self, tag: u16, src: Option<usize>) -> (usize, Vec<u64>) {
        let mbox = &self.shared.mailboxes[self.rank];
        let mut queue = mbox.queue.lock();
        loop {
            let found = queue
                .iter()
                .position(|e| e.tag == tag && src.is_none_or(|s| e.src == s));
            if let Some(i) = found {
                if let Some(env) = queue.remove(i) {
                    return (env.src, env.data);
                }
            }
            mbox.ready.wait(&mut queue);
        }
    }
}

impl Group for LocalGroup {
    /// Mailbox sends complete at post time (the payload is copied),
    /// so completion needs no bookkeeping.
    type SendToken = ();

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.mailboxes.len()
    }

    fn exchange_counts(&self, sendcounts: &[u64]) -> Result<Vec<u64>> {
        let p = self.size();
        if sendcounts.len() != p {
            return Err(Error::transport(
                "exchange_counts",
                format!("expected {p} send counts, got {}", sendcounts.len()),
            ));
        }

        let mut received = vec![0u64; p];
        received[self.rank] = sendcounts[self.rank];

        // Pairwise rounds: step k posts to (rank + k) mod p.
        for step in 1..p {
            let dest = (self.rank + step) % p;
            self.post(dest, TAG_COUNTS, vec![sendcounts[dest]])?;
        }

        for _ in 1..p {
            let (src, data) = self.take_match(TAG_COUNTS, None);
            if data.len() != 1 {
                return Err(Error::transport(
                    "exchange_counts",
                    format!("malformed count message from rank {src}"),
                ));
            }
            received[src] = data[0];
        }

        Ok(received)
    }

    fn exchange_values(
        &self,
        packed: &[u64],
        sendcounts: &[u64],
        recvcounts: &[u64],
    ) -> Result<Vec<u64>> {
        let p = self.size();
        if sendcounts.len() != p || recvcounts.len() != p {
            return Err(Error::transport(
                "exchange_values",
                format!("count slices must have length {p}"),
            ));
        }

        let send_total: u64 = sendcounts.iter().sum();
        if packed.len() as u64 != send_total {
            return Err(Error::transport(
                "exchange_values",
                format!("packed buffer holds {} values, counts say {send_total}", packed.len()),
            ));
        }

        let sdispls = exclusive_prefix(sendcounts);
        let rdispls = exclusive_prefix(recvcounts);
        let recv_total: u64 = recvcounts.iter().sum();
        let mut received = vec![0u64; recv_total as usize];

        // Local slice moves without a message.
        let own_src = slice_at(packed, sdispls[self.rank], sendcounts[self.rank]);
        let own_at = rdispls[self.rank] as usize;
        received[own_at..own_at + own_src.len()].copy_from_slice(own_src);

        for step in 1..p {
            let dest = (self.rank + step) % p;
            let chunk = slice_at(packed, sdispls[dest], sendcounts[dest]);
            self.post(dest, TAG_VALUES, chunk.to_vec())?;
        }

        for _ in 1..p {
            let (src, data) = self.take_match(TAG_VALUES, None);
            if data.len() as u64 != recvcounts[src] {
                return Err(Error::transport(
                    "exchange_values",
                    format!(
                        "rank {src} sent {} values, counts say {}",
                        data.len(),
                        recvcounts[src]
                    ),
                ));
            }
            let at = rdispls[src] as usize;
            received[at..at + data.len()].copy_from_slice(&data);
        }

        Ok(received)
    }

    fn scan_sum(&self, value: u64) -> Result<u64> {
        let below = if self.rank == 0 {
            0
        } else {
            let data = self.recv_from(self.rank - 1, TAG_SCAN)?;
            if data.len() != 1 {
                return Err(Error::transport("scan_sum", "malformed partial sum"));
            }
            data[0]
        };

        let acc = below + value;
        if self.rank + 1 < self.size() {
            self.post(self.rank + 1, TAG_SCAN, vec![acc])?;
        }
        Ok(acc)
    }

    fn send_async(&self, dest: usize, tag: u16, payload: &[u64]) -> Result<()> {
        if tag >= RESERVED_TAG_BASE {
            return Err(Error::transport(
                "send",
                format!("tag {tag} is reserved for collectives"),
            ));
        }
        trace_log!(rank = self.rank, dest, tag, len = payload.len(), "send");
        self.post(dest, tag, payload.to_vec())
    }

    fn recv_any(&self, tag: u16) -> Result<(usize, Vec<u64>)> {
        Ok(self.take_match(tag, None))
    }

    fn recv_from(&self, src: usize, tag: u16) -> Result<Vec<u64>> {
        if src >= self.size() {
            return Err(Error::transport(
                "recv",
                format!("source rank {src} out of range"),
            ));
        }
        let (_, data) = self.take_match(tag, Some(src));
        Ok(data)
    }

    fn wait_all(&self, _tokens: Vec<()>) -> Result<()> {
        // Posted envelopes already own their payload copy.
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        self.shared.gate.wait();
        Ok(())
    }
}

/// Exclusive prefix sums of `counts`, as displacements.
fn exclusive_prefix(counts: &[u64]) -> Vec<u64> {
    let mut displs = Vec::with_capacity(counts.len());
    let mut sum = 0u64;
    for &c in counts {
        displs.push(sum);
        sum += c;
    }
    displs
}

/// The sub-slice of `buf` starting at `displ` with `count` elements.
fn slice_at(buf: &[u64], displ: u64, count: u64) -> &[u64] {
    &buf[displ as usize..(displ + count) as usize]
}
