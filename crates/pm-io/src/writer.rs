use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pm_core::Matrix;

use crate::error::Result;

/// Render a matrix in the text format read by [`crate::parse_matrix`].
///
/// The first line holds the dimensions, then one line per row. Values use
/// the shortest representation that parses back to the same `f64`.
pub fn format_matrix(matrix: &Matrix) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} {}", matrix.rows(), matrix.cols());
    for row in matrix.as_slice().chunks(matrix.cols()) {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

/// Write a matrix to `path` in the text format, replacing any existing file.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_matrix(matrix).as_bytes())?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), dims = %matrix.dims(), "matrix written");
    Ok(())
}
