use std::fmt::Debug;

use crate::error::Result;
use crate::matrix::Matrix;

/// The outcome of one multiplication `C = A @ B`.
#[derive(Debug, Clone)]
pub struct Product {
    /// The product matrix `C`.
    pub matrix: Matrix,
    /// Sum of every element of `C`.
    pub total_sum: f64,
    /// Frobenius norm of `C`.
    pub frobenius_norm: f64,
    /// Worker count the caller asked for.
    pub requested_workers: usize,
    /// Worker count actually used.
    pub effective_workers: usize,
    /// Ids of workers that failed when failures were isolated. Their cells
    /// are left at zero and their totals are missing from the aggregate.
    pub failed_workers: Vec<usize>,
}

impl Product {
    /// Returns true if fewer workers ran than were requested.
    pub fn was_clamped(&self) -> bool {
        self.effective_workers < self.requested_workers
    }

    /// Returns false if any worker failed, in which case the matrix and the
    /// statistics must not be trusted.
    pub fn is_complete(&self) -> bool {
        self.failed_workers.is_empty()
    }
}

/// Trait for matrix multiplication strategies.
///
/// Implementations check that `a.cols() == b.rows()` before doing any work
/// and return `DimensionMismatch` otherwise.
pub trait Multiplier: Send + Sync + Debug {
    /// Returns the name of this strategy (e.g., "serial", "threaded").
    fn name(&self) -> &str;

    /// Compute `a @ b` together with the sum and Frobenius norm of the result.
    ///
    /// - `a`: matrix of shape [m, k]
    /// - `b`: matrix of shape [k, n]
    /// - Returns: the [m, n] product and its statistics
    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Product>;
}
