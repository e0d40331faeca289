//! `pm-core` - Thread-parallel dense matrix multiplication for parallel-matmul.
//!
//! This crate provides:
//! - A bounds-checked `Matrix` type with row-major `f64` storage
//! - A `Partition` that splits the flattened output into balanced chunks
//! - `WorkerTask`, which computes one chunk and merges its local totals once
//! - An `Aggregator` holding the run-wide sum and sum of squares
//! - A `Multiplier` trait with a `ThreadedMultiplier` and a `SerialMultiplier`
//!   reference implementation

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod partition;
pub mod serial;
pub mod shape;
pub mod worker;

// Re-export primary types at the crate root for convenience.
pub use aggregate::{Aggregator, Totals};
pub use backend::{Multiplier, Product};
pub use config::{CancellationToken, FailurePolicy, RunConfig};
pub use engine::ThreadedMultiplier;
pub use error::{MatrixError, Result};
pub use matrix::{ChunkMut, Matrix};
pub use partition::{Chunk, Partition};
pub use serial::SerialMultiplier;
pub use shape::Dims;
pub use worker::{PartialStats, WorkerTask};
