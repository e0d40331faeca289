mod generate;
mod multiply;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// pmatmul command-line interface
#[derive(Parser, Debug)]
#[command(name = "pmatmul", version, about = "Thread-parallel matrix multiplication")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    command: Command,
}

/// Supported subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Multiply two matrix files and report the sum and Frobenius norm
    Multiply(multiply::MultiplyArgs),
    /// Write a random whole-number matrix file
    Generate(generate::GenerateArgs),
}

/// Send logs to stderr so stdout carries only the results.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Multiply(args) => multiply::run(args),
        Command::Generate(args) => generate::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
