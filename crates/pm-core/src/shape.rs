use crate::error::{MatrixError, Result};
use std::fmt;

/// The dimensions of a 2D matrix.
///
/// Both dimensions are non-zero once constructed through [`Dims::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    rows: usize,
    cols: usize,
}

impl Dims {
    /// Create a new pair of dimensions.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either dimension is zero, or if a
    /// `rows x cols` buffer of `f64` would not fit in the address space.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::InvalidArgument(format!(
                "matrix dimensions must be positive, got {}x{}",
                rows, cols
            )));
        }
        let fits = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f64>()))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(MatrixError::InvalidArgument(format!(
                "matrix dimensions {}x{} are too large",
                rows, cols
            )));
        }
        Ok(Dims { rows, cols })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements (`rows * cols`). Cannot overflow, see
    /// [`Dims::new`].
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns true if `(row, col)` addresses a cell inside these dimensions.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Row-major flat index of `(row, col)`.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if the pair lies outside the matrix.
    pub fn flatten(&self, row: usize, col: usize) -> Result<usize> {
        if !self.contains(row, col) {
            return Err(self.out_of_range(row, col));
        }
        Ok(row * self.cols + col)
    }

    /// Decode a row-major flat index into `(row, col)`.
    ///
    /// No bounds check is made on the row; callers that need one use
    /// [`Dims::contains`] on the result.
    pub fn unflatten(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Check the inner dimensions of `self @ other` and return the
    /// dimensions of the product.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if `self.cols() != other.rows()`, and
    /// `InvalidArgument` if the product would be too large to allocate.
    pub fn matmul(&self, other: &Dims) -> Result<Dims> {
        if self.cols != other.rows {
            return Err(MatrixError::DimensionMismatch {
                m: self.rows,
                k: self.cols,
                k2: other.rows,
                n: other.cols,
            });
        }
        Dims::new(self.rows, other.cols)
    }

    pub(crate) fn out_of_range(&self, row: usize, col: usize) -> MatrixError {
        MatrixError::IndexOutOfRange {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
