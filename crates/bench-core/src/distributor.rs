//! Lock-free work distribution.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out unique work-item indices in `[0, total)`.
///
/// Every call to [`claim_next`](Self::claim_next) performs a single
/// fetch-and-increment; the pre-increment value is the claimed index. Once the
/// counter passes `total` every caller sees exhaustion. The counter keeps
/// growing past `total`, which is harmless for any realistic run length.
#[derive(Debug)]
pub struct WorkDistributor {
    next: AtomicUsize,
    total: usize,
}

impl WorkDistributor {
    /// Create a distributor for `total` work items.
    pub fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
        }
    }

    /// Claim the next unclaimed index, or `None` when the supply is exhausted.
    #[inline]
    pub fn claim_next(&self) -> Option<usize> {
        // Relaxed is enough: uniqueness comes from the RMW itself, and the
        // claimed slot is published later through the processed counter.
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < self.total).then_some(index)
    }

    /// Total number of work items.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of indices handed out so far.
    pub fn claimed(&self) -> usize {
        self.next.load(Ordering::Relaxed).min(self.total)
    }
}
