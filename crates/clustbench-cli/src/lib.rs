// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod error;
pub mod io;

pub use error::CliError;

use clustbench_algos::AlgorithmFamily;
use clustbench_core::{BenchError, BenchmarkDriver, ExecutionContext, RunDiagnostics};
use std::fs;
use std::path::{Path, PathBuf};

/// One benchmark invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub matrix: PathBuf,
    pub true_labels: PathBuf,
    pub output_dir: PathBuf,
    pub name: String,
    pub method: String,
    pub seed: Option<u64>,
    pub diagnostics: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub diagnostics: RunDiagnostics,
}

fn require_file(path: &Path, flag: &str) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BenchError::configuration(format!(
            "{flag} path does not exist or is not a file: {}",
            path.display()
        ))
        .into())
    }
}

/// Loads the inputs, runs the selected family and writes the label matrix.
///
/// The family name and the input paths are checked before anything is read,
/// and no output is written unless the whole sweep succeeded.
pub fn run_benchmark(
    config: &RunConfig,
    ctx: &ExecutionContext<'_>,
) -> Result<RunSummary, CliError> {
    let family: AlgorithmFamily = config.method.parse()?;
    require_file(&config.matrix, "--data.matrix")?;
    require_file(&config.true_labels, "--data.true_labels")?;
    if !config.output_dir.is_dir() {
        return Err(BenchError::configuration(format!(
            "--output_dir is not a directory: {}",
            config.output_dir.display()
        ))
        .into());
    }
    if config.name.is_empty() || config.name.contains(|c: char| c == '/' || c == '\\') {
        return Err(BenchError::configuration(format!(
            "--name must be a non-empty file name stem; got '{}'",
            config.name
        ))
        .into());
    }

    let truth = io::load_labels(&config.true_labels)?;
    let dataset = io::load_dataset(&config.matrix)?;
    let data = dataset.view()?;

    let runner = family.build_runner(config.seed)?;
    let outcome = BenchmarkDriver::new(runner.as_ref()).run(&data, &truth, ctx)?;

    let output = io::output_path(&config.output_dir, &config.name);
    io::write_matrix_gz(&output, &outcome.matrix)?;
    tracing::info!(path = %output.display(), "wrote label matrix");

    if let Some(path) = &config.diagnostics {
        let json = serde_json::to_string_pretty(&outcome.diagnostics)
            .map_err(|err| CliError::json("failed to serialize diagnostics", err))?;
        fs::write(path, json)
            .map_err(|err| CliError::io(format!("failed to write {}", path.display()), err))?;
    }

    Ok(RunSummary {
        output,
        diagnostics: outcome.diagnostics,
    })
}
