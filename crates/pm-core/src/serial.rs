use crate::backend::{Multiplier, Product};
use crate::error::Result;
use crate::matrix::Matrix;

/// Single-threaded reference multiplier.
///
/// Uses the same per-cell summation order as the threaded engine, so the two
/// produce bit-identical product matrices. Intended for cross-checking.
#[derive(Debug, Clone)]
pub struct SerialMultiplier;

impl SerialMultiplier {
    pub fn new() -> Self {
        SerialMultiplier
    }
}

impl Default for SerialMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplier for SerialMultiplier {
    fn name(&self) -> &str {
        "serial"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Product> {
        let dims = a.dims().matmul(&b.dims())?;
        let (m, k, n) = (a.rows(), a.cols(), b.cols());
        let a_data = a.as_slice();
        let b_data = b.as_slice();

        let mut c = vec![0.0f64; m * n];
        let mut sum = 0.0f64;
        let mut sum_of_squares = 0.0f64;
        for i in 0..m {
            for j in 0..n {
                let mut cell = 0.0f64;
                for p in 0..k {
                    cell += a_data[i * k + p] * b_data[p * n + j];
                }
                c[i * n + j] = cell;
                sum += cell;
                sum_of_squares += cell * cell;
            }
        }

        Ok(Product {
            matrix: Matrix::from_vec(dims.rows(), dims.cols(), c)?,
            total_sum: sum,
            frobenius_norm: sum_of_squares.sqrt(),
            requested_workers: 1,
            effective_workers: 1,
            failed_workers: Vec::new(),
        })
    }
}
