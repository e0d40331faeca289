use crate::aggregate::Aggregator;
use crate::config::CancellationToken;
use crate::error::{MatrixError, Result};
use crate::matrix::{ChunkMut, Matrix};

/// The statistics one worker accumulated over its chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialStats {
    pub sum: f64,
    pub sum_of_squares: f64,
    /// Number of output cells written.
    pub cells: usize,
}

/// One unit of parallel work: every output cell of a single chunk.
///
/// `a` is `[m, k]`, `b` is `[k, n]`, and `out` views a chunk of the `[m, n]`
/// product. The task only reads `a` and `b` and only writes through `out`,
/// so tasks over disjoint chunks can run concurrently without locking.
#[derive(Debug)]
pub struct WorkerTask<'a> {
    id: usize,
    a: &'a Matrix,
    b: &'a Matrix,
    out: ChunkMut<'a>,
    cancel: &'a CancellationToken,
}

impl<'a> WorkerTask<'a> {
    pub fn new(
        id: usize,
        a: &'a Matrix,
        b: &'a Matrix,
        out: ChunkMut<'a>,
        cancel: &'a CancellationToken,
    ) -> Self {
        WorkerTask {
            id,
            a,
            b,
            out,
            cancel,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the run this task belongs to has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Compute the chunk, then merge the local totals into `aggregator`.
    ///
    /// The merge happens exactly once and only if the whole chunk was
    /// computed. A failed or cancelled task leaves the aggregator untouched.
    pub fn run(mut self, aggregator: &Aggregator) -> Result<PartialStats> {
        let chunk = self.out.chunk();
        let _span =
            tracing::debug_span!("worker", id = self.id, start = chunk.start, end = chunk.end)
                .entered();

        let stats = self.compute()?;
        aggregator.merge(stats.sum, stats.sum_of_squares);

        tracing::debug!(cells = stats.cells, sum = stats.sum, "chunk done");
        Ok(stats)
    }

    fn compute(&mut self) -> Result<PartialStats> {
        let dims = self.out.dims();
        let chunk = self.out.chunk();
        let mut stats = PartialStats::default();

        for i in chunk.start..chunk.end {
            if self.cancel.is_cancelled() {
                return Err(MatrixError::Cancelled);
            }

            let (row, col) = dims.unflatten(i);
            if !dims.contains(row, col) {
                tracing::warn!(row, col, index = i, "decoded index outside the product, skipping");
                continue;
            }

            let value = self.dot(row, col)?;
            self.out.set(row, col, value)?;

            stats.sum += value;
            stats.sum_of_squares += value * value;
            stats.cells += 1;
        }

        Ok(stats)
    }

    /// Row `row` of `a` dotted with column `col` of `b`, summed in column
    /// order of `a`.
    fn dot(&self, row: usize, col: usize) -> Result<f64> {
        let mut sum = 0.0;
        for (j, a_val) in self.a.row(row)?.iter().enumerate() {
            sum += a_val * self.b.get(j, col)?;
        }
        Ok(sum)
    }
}
