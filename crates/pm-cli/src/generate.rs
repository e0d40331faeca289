use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Args;

/// Write a random matrix file in the text format
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Number of rows
    #[arg(long)]
    pub rows: usize,

    /// Number of columns
    #[arg(long)]
    pub cols: usize,

    /// Largest generated value; values are whole numbers in 1..=max
    #[arg(long, default_value_t = 100)]
    pub max: u32,

    /// RNG seed (defaults to the current time)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    let matrix = pm_io::random_matrix(args.rows, args.cols, args.max, seed)
        .context("failed to generate matrix")?;
    pm_io::write_matrix(&args.output, &matrix)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    tracing::info!(path = %args.output.display(), dims = %matrix.dims(), seed, "matrix generated");
    println!("Matrix {} written to {}", matrix.dims(), args.output.display());
    Ok(())
}
