use std::fmt;

use crate::error::{MatrixError, Result};
use crate::partition::Chunk;
use crate::shape::Dims;

/// A dense, row-major matrix of `f64` values.
///
/// The dimensions are fixed at construction; the contents may be changed
/// through the bounds-checked [`Matrix::set`].
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dims: Dims,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled `rows x cols` matrix.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::zeros(Dims::new(rows, cols)?))
    }

    /// Create a zero-filled matrix with the given dimensions.
    pub fn zeros(dims: Dims) -> Self {
        Matrix {
            dims,
            data: vec![0.0; dims.numel()],
        }
    }

    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if a dimension is zero or
    /// `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let dims = Dims::new(rows, cols)?;
        if data.len() != dims.numel() {
            return Err(MatrixError::InvalidArgument(format!(
                "data length {} does not match {} matrix (numel={})",
                data.len(),
                dims,
                dims.numel()
            )));
        }
        Ok(Matrix { dims, data })
    }

    /// Create a matrix from a slice of rows.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if there are no rows, the rows are empty,
    /// or the rows have differing lengths.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let dims = Dims::new(rows.len(), cols)?;
        let mut data = Vec::with_capacity(dims.numel());
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::InvalidArgument(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix { dims, data })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.dims.rows()
    }

    pub fn cols(&self) -> usize {
        self.dims.cols()
    }

    /// Read the element at `(row, col)`.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if the position lies outside the matrix.
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        let i = self.dims.flatten(row, col)?;
        Ok(self.data[i])
    }

    /// Overwrite the element at `(row, col)`.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if the position lies outside the matrix.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let i = self.dims.flatten(row, col)?;
        self.data[i] = value;
        Ok(())
    }

    /// Borrow one row as a slice.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if `row >= rows()`.
    pub fn row(&self, row: usize) -> Result<&[f64]> {
        if row >= self.rows() {
            return Err(self.dims.out_of_range(row, 0));
        }
        let cols = self.cols();
        Ok(&self.data[row * cols..(row + 1) * cols])
    }

    /// The underlying row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// An owned copy of the contents, one `Vec` per row.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols()).map(<[f64]>::to_vec).collect()
    }

    /// Sum of all elements, computed serially.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Frobenius norm of the matrix, computed serially.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Split the storage into one mutable view per chunk.
    ///
    /// The chunks must be contiguous, start at 0, and together cover every
    /// element exactly once, which is what [`crate::Partition::split`]
    /// produces. Each returned view can only write the cells of its chunk.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the chunks do not tile the matrix.
    pub fn split_chunks_mut(&mut self, chunks: &[Chunk]) -> Result<Vec<ChunkMut<'_>>> {
        let dims = self.dims;
        let mut rest: &mut [f64] = &mut self.data;
        let mut offset = 0;
        let mut views = Vec::with_capacity(chunks.len());

        for &chunk in chunks {
            if chunk.start != offset || chunk.len() > rest.len() {
                return Err(MatrixError::InvalidArgument(format!(
                    "chunk [{}, {}) does not continue at offset {} of a {} matrix",
                    chunk.start, chunk.end, offset, dims
                )));
            }
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(chunk.len());
            views.push(ChunkMut {
                dims,
                chunk,
                data: head,
            });
            rest = tail;
            offset = chunk.end;
        }

        if offset != dims.numel() {
            return Err(MatrixError::InvalidArgument(format!(
                "chunks cover {} of {} elements",
                offset,
                dims.numel()
            )));
        }
        Ok(views)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in self.data.chunks(self.cols()) {
            for value in row {
                write!(f, "{:?} ", value)?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

/// A mutable view over the cells of one chunk of a matrix.
///
/// Cells are still addressed by `(row, col)` of the full matrix; writes to
/// cells owned by another chunk are rejected.
#[derive(Debug)]
pub struct ChunkMut<'a> {
    dims: Dims,
    chunk: Chunk,
    data: &'a mut [f64],
}

impl ChunkMut<'_> {
    /// Dimensions of the whole matrix this view belongs to.
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// The flat index range this view covers.
    pub fn chunk(&self) -> Chunk {
        self.chunk
    }

    fn local_index(&self, row: usize, col: usize) -> Result<usize> {
        let index = self.dims.flatten(row, col)?;
        if !self.chunk.contains(index) {
            return Err(MatrixError::OutsideChunk {
                index,
                start: self.chunk.start,
                end: self.chunk.end,
            });
        }
        Ok(index - self.chunk.start)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        let i = self.local_index(row, col)?;
        Ok(self.data[i])
    }

    /// Overwrite the element at `(row, col)` of the full matrix.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` outside the matrix, `OutsideChunk` for a
    /// cell that belongs to another chunk.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let i = self.local_index(row, col)?;
        self.data[i] = value;
        Ok(())
    }
}
