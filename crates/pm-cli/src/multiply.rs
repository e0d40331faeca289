use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use pm_core::{FailurePolicy, Multiplier, Product, RunConfig, SerialMultiplier, ThreadedMultiplier};

/// Multiply two matrix files
#[derive(Args, Debug)]
pub struct MultiplyArgs {
    /// Left-hand matrix file (m x k)
    pub a: PathBuf,

    /// Right-hand matrix file (k x n)
    pub b: PathBuf,

    /// Number of worker threads; reduced to m*n if larger
    #[arg(env = "PMATMUL_WORKERS")]
    pub workers: usize,

    /// Also write the product matrix to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep going when a worker fails and report the failed workers
    #[arg(long)]
    pub isolate_failures: bool,

    /// Use the single-threaded reference multiplier
    #[arg(long, conflicts_with = "isolate_failures")]
    pub serial: bool,
}

pub fn run(args: MultiplyArgs) -> anyhow::Result<()> {
    let a = pm_io::read_matrix(&args.a)
        .with_context(|| format!("failed to load matrix A from {}", args.a.display()))?;
    let b = pm_io::read_matrix(&args.b)
        .with_context(|| format!("failed to load matrix B from {}", args.b.display()))?;

    if a.cols() != b.rows() {
        bail!(
            "invalid matrix dimensions, cannot multiply {} by {}",
            a.dims(),
            b.dims()
        );
    }

    let policy = if args.isolate_failures {
        FailurePolicy::Isolate
    } else {
        FailurePolicy::FailFast
    };
    let config = RunConfig::new(args.workers).with_failure_policy(policy);
    // Checked here so a bad count is rejected with --serial too.
    config.validate().context("invalid worker count")?;

    let multiplier: Box<dyn Multiplier> = if args.serial {
        Box::new(SerialMultiplier::new())
    } else {
        Box::new(ThreadedMultiplier::new(config))
    };
    tracing::debug!(multiplier = multiplier.name(), "multiplier selected");

    let product = multiplier.multiply(&a, &b).context("multiplication failed")?;
    print!("{}", render_report(&product));

    if let Some(path) = &args.output {
        pm_io::write_matrix(path, &product.matrix)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
    }

    if !product.is_complete() {
        bail!(
            "workers {:?} failed, the result above is incomplete",
            product.failed_workers
        );
    }
    Ok(())
}

/// The console report: an optional clamping notice, the product matrix, and
/// its sum and Frobenius norm.
pub fn render_report(product: &Product) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    if product.was_clamped() {
        let _ = writeln!(
            out,
            "Number of operations ({}) is less than number of threads! Setting {} threads.",
            product.matrix.dims().numel(),
            product.effective_workers
        );
    }
    let _ = writeln!(out, "Result matrix:");
    let _ = writeln!(out, "{}", product.matrix);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Sum of elements in result matrix: {:.2}",
        product.total_sum
    );
    let _ = writeln!(
        out,
        "Frobenius norm of result matrix: {:.6}",
        product.frobenius_norm
    );
    out
}
