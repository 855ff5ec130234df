// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clap::Parser;
use clap::error::ErrorKind;
use clustbench_cli::{CliError, RunConfig, run_benchmark};
use clustbench_core::{DEFAULT_SEED, ExecutionContext};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, fmt};

/// Runs one clustering family over the k-range around the true cluster count
/// and writes the resulting label matrix.
#[derive(Debug, Parser)]
#[command(name = "clustbench", version)]
struct Args {
    /// Delimited-text data matrix, optionally gzip-compressed.
    #[arg(long = "data.matrix", value_name = "PATH")]
    matrix: PathBuf,

    /// Delimited-text true labels; their maximum sets the k-range.
    #[arg(long = "data.true_labels", value_name = "PATH")]
    true_labels: PathBuf,

    #[arg(long = "output_dir", value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Stem of the output file `{name}_ks_range.labels.gz`.
    #[arg(long, default_value = "clustbench")]
    name: String,

    /// One of: birch, kmeans, spectral, gm.
    #[arg(long)]
    method: String,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Also write run diagnostics as JSON to this path.
    #[arg(long, value_name = "PATH")]
    diagnostics: Option<PathBuf>,

    /// Evaluate grid cells in parallel (requires the `rayon` feature).
    #[arg(long)]
    parallel: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(CliError::usage(err.to_string().trim_end())),
    };
    init_tracing(args.verbose);

    let config = RunConfig {
        matrix: args.matrix,
        true_labels: args.true_labels,
        output_dir: args.output_dir,
        name: args.name,
        method: args.method,
        seed: Some(args.seed),
        diagnostics: args.diagnostics,
    };
    let ctx = ExecutionContext::new().with_parallel(args.parallel);
    let summary = run_benchmark(&config, &ctx)?;
    for warning in &summary.diagnostics.warnings {
        tracing::warn!("{warning}");
    }
    println!("{}", summary.output.display());
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
