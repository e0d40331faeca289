use pm_core::{Matrix, MatrixError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;

/// Build a `rows x cols` matrix of whole numbers drawn uniformly from
/// `1..=max_value`.
///
/// The same seed always yields the same matrix.
pub fn random_matrix(rows: usize, cols: usize, max_value: u32, seed: u64) -> Result<Matrix> {
    if max_value == 0 {
        return Err(MatrixError::InvalidArgument(
            "maximum generated value must be at least 1".to_string(),
        )
        .into());
    }
    let mut m = Matrix::new(rows, cols)?;
    let mut rng = StdRng::seed_from_u64(seed);
    for row in 0..rows {
        for col in 0..cols {
            m.set(row, col, f64::from(rng.gen_range(1..=max_value)))?;
        }
    }
    Ok(m)
}
