//! `pm-io` - Matrix text files and test input generation for parallel-matmul.
//!
//! The text format is a sequence of whitespace-separated tokens: the number
//! of rows, the number of columns, then every value in row-major order.

pub mod error;
pub mod generate;
pub mod reader;
pub mod writer;

pub use error::{FormatError, Result};
pub use generate::random_matrix;
pub use reader::{parse_matrix, read_matrix};
pub use writer::{format_matrix, write_matrix};
