use crate::error::{MatrixError, Result};

/// A half-open range `[start, end)` of flattened output indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "chunk start {} is past end {}", start, end);
        Chunk { start, end }
    }

    /// Number of indices covered by this chunk.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// The result of splitting an index range across workers.
///
/// `requested` is the worker count the caller asked for, `effective` the
/// number of chunks actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub chunks: Vec<Chunk>,
    pub requested: usize,
    pub effective: usize,
}

impl Partition {
    /// Split `[0, total_ops)` into contiguous chunks, one per worker.
    ///
    /// If more workers are requested than there are indices, the count is
    /// clamped to `total_ops` so that every worker gets exactly one index.
    /// The first `total_ops % effective` chunks are one element longer than
    /// the rest.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `total_ops` or `requested` is zero.
    pub fn split(total_ops: usize, requested: usize) -> Result<Partition> {
        if total_ops == 0 {
            return Err(MatrixError::InvalidArgument(
                "cannot partition an empty index range".to_string(),
            ));
        }
        if requested == 0 {
            return Err(MatrixError::InvalidArgument(
                "number of workers must be greater than 0".to_string(),
            ));
        }

        let effective = requested.min(total_ops);
        if effective < requested {
            tracing::info!(
                total_ops,
                requested,
                effective,
                "more workers requested than output cells, clamping worker count"
            );
        }

        let chunk_size = total_ops / effective;
        let remainder = total_ops % effective;

        let mut chunks = Vec::with_capacity(effective);
        let mut start = 0;
        for i in 0..effective {
            let end = start + chunk_size + usize::from(i < remainder);
            chunks.push(Chunk::new(start, end));
            start = end;
        }
        debug_assert_eq!(start, total_ops);

        Ok(Partition {
            chunks,
            requested,
            effective,
        })
    }

    /// Returns true if the worker count was reduced below what was requested.
    pub fn was_clamped(&self) -> bool {
        self.effective < self.requested
    }

    /// Total number of indices covered.
    pub fn total_ops(&self) -> usize {
        self.chunks.last().map(|c| c.end).unwrap_or(0)
    }
}
