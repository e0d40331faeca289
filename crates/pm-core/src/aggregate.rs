use std::sync::{Mutex, MutexGuard};

/// Running totals over the cells of a product matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub sum: f64,
    pub sum_of_squares: f64,
    pub merges: usize,
}

/// Shared accumulator for the per-worker partial statistics of one run.
///
/// Workers call [`Aggregator::merge`] exactly once each, from any thread and
/// in any order. The readers are meant to be used after every worker has
/// been joined.
#[derive(Debug, Default)]
pub struct Aggregator {
    totals: Mutex<Totals>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    // The totals are plain numbers, so a panic while holding the lock
    // cannot leave them half-updated.
    fn lock(&self) -> MutexGuard<'_, Totals> {
        self.totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Zero both totals and the merge count.
    pub fn reset(&self) {
        *self.lock() = Totals::default();
    }

    /// Add one worker's local sum and sum of squares to the global totals.
    pub fn merge(&self, local_sum: f64, local_sum_of_squares: f64) {
        let mut totals = self.lock();
        totals.sum += local_sum;
        totals.sum_of_squares += local_sum_of_squares;
        totals.merges += 1;
    }

    /// Sum of every merged cell.
    pub fn total_sum(&self) -> f64 {
        self.lock().sum
    }

    /// Square root of the merged sum of squares.
    pub fn frobenius_norm(&self) -> f64 {
        self.lock().sum_of_squares.sqrt()
    }

    /// Number of merges since construction or the last reset.
    pub fn merges(&self) -> usize {
        self.lock().merges
    }

    /// A copy of the current totals.
    pub fn snapshot(&self) -> Totals {
        *self.lock()
    }
}
