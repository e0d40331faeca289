use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("index out of bounds: [{row}][{col}] for a {rows}x{cols} matrix")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("flat index {index} lies outside chunk [{start}, {end})")]
    OutsideChunk {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    DimensionMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: Box<MatrixError>,
    },
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("multiplication was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, MatrixError>;
