use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel for a total that the remote side has not reported yet.
pub const UNKNOWN_TOTAL: u64 = u64::MAX;

/// Expected and cumulative byte counters of one transfer.
///
/// Both counters are atomics so every file pipeline of a transfer can
/// account its slices through a shared reference.
#[derive(Debug)]
pub struct Progress {
    total:       AtomicU64,
    transferred: AtomicU64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            total:       AtomicU64::new(UNKNOWN_TOTAL),
            transferred: AtomicU64::new(0),
        }
    }
}

impl Progress {
    pub fn new() -> Self { Self::default() }

    pub fn with_total(total: u64) -> Self {
        let progress = Self::new();
        progress.set_total(total);
        progress
    }

    pub fn set_total(&self, total: u64) { self.total.store(total, Ordering::Release); }

    /// Expected byte count, or [`UNKNOWN_TOTAL`].
    pub fn total(&self) -> u64 { self.total.load(Ordering::Acquire) }

    pub fn is_total_known(&self) -> bool { self.total() != UNKNOWN_TOTAL }

    pub fn transferred(&self) -> u64 { self.transferred.load(Ordering::Acquire) }

    /// Add `delta` bytes and return the new cumulative count.
    pub fn add(&self, delta: u64) -> u64 {
        self.transferred
            .fetch_add(delta, Ordering::AcqRel)
            .saturating_add(delta)
    }

    /// Raise the cumulative count to `cumulative` and return the bytes this added.
    ///
    /// A `cumulative` lower than the current count leaves the counter untouched
    /// and returns zero.
    pub fn advance_to(&self, cumulative: u64) -> u64 {
        let previous = self.transferred.fetch_max(cumulative, Ordering::AcqRel);
        cumulative.saturating_sub(previous)
    }
}
