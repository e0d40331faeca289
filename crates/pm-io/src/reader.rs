use std::path::Path;

use pm_core::Matrix;

use crate::error::{FormatError, Result};

// Cap on the up-front allocation so a bogus header cannot reserve gigabytes
// before the values are actually read.
const MAX_PREALLOC: usize = 1 << 20;

/// Read and parse a matrix text file.
pub fn read_matrix(path: &Path) -> Result<Matrix> {
    tracing::debug!(path = %path.display(), "reading matrix");
    let text = std::fs::read_to_string(path)?;
    let matrix = parse_matrix(&text)?;
    tracing::debug!(path = %path.display(), dims = %matrix.dims(), "matrix loaded");
    Ok(matrix)
}

/// Parse a matrix from text.
///
/// Tokens may be separated by any whitespace, so both the one-row-per-line
/// and the one-value-per-line layouts are accepted. Tokens after the last
/// value are ignored.
pub fn parse_matrix(text: &str) -> Result<Matrix> {
    let mut tokens = text.split_whitespace();

    let rows = parse_dimension(tokens.next())?;
    let cols = parse_dimension(tokens.next())?;
    let numel = rows
        .checked_mul(cols)
        .ok_or_else(|| FormatError::InvalidDimension {
            token: format!("{}x{}", rows, cols),
        })?;

    // Zero dimensions are rejected by Matrix itself.
    let mut data = Vec::with_capacity(numel.min(MAX_PREALLOC));
    for row in 0..rows {
        for col in 0..cols {
            let token = tokens
                .next()
                .ok_or(FormatError::MissingValue { row, col })?;
            let value = token
                .parse::<f64>()
                .map_err(|_| FormatError::InvalidNumber {
                    row,
                    col,
                    token: token.to_string(),
                })?;
            data.push(value);
        }
    }

    let trailing = tokens.count();
    if trailing > 0 {
        tracing::warn!(trailing, "ignoring tokens after the last matrix value");
    }

    Ok(Matrix::from_vec(rows, cols, data)?)
}

fn parse_dimension(token: Option<&str>) -> Result<usize> {
    let token = token.ok_or(FormatError::MissingDimensions)?;
    token
        .parse::<usize>()
        .map_err(|_| FormatError::InvalidDimension {
            token: token.to_string(),
        })
}
