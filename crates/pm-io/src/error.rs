use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("expected matrix dimensions (rows and columns) at the beginning of the input")]
    MissingDimensions,
    #[error("invalid matrix dimension: {token:?}")]
    InvalidDimension { token: String },
    #[error("expected a number at position [{row}][{col}], reached end of input")]
    MissingValue { row: usize, col: usize },
    #[error("expected a number at position [{row}][{col}], got {token:?}")]
    InvalidNumber {
        row: usize,
        col: usize,
        token: String,
    },
    #[error("matrix error: {0}")]
    Matrix(#[from] pm_core::MatrixError),
}

pub type Result<T> = std::result::Result<T, FormatError>;
