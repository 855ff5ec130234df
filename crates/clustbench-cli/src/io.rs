// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Delimited-text decoding of benchmark inputs and gzip encoding of the
//! result matrix.

use crate::error::CliError;
use clustbench_core::{BenchError, DatasetView, ResultMatrix, TrueLabels};
use flate2::read::MultiGzDecoder;
use flate2::{Compression, GzBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Owned row-major dataset decoded from a matrix file.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedDataset {
    pub values: Vec<f64>,
    pub n: usize,
    pub d: usize,
}

impl LoadedDataset {
    pub fn view(&self) -> Result<DatasetView<'_>, BenchError> {
        DatasetView::new(&self.values, self.n, self.d)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Reads `path` as UTF-8 text, gunzipping when it ends in `.gz`.
pub fn read_text(path: &Path) -> Result<String, CliError> {
    let context = || format!("failed to read {}", path.display());
    if !is_gzip(path) {
        return fs::read_to_string(path).map_err(|err| CliError::io(context(), err));
    }
    let file = File::open(path).map_err(|err| CliError::io(context(), err))?;
    let mut raw = String::new();
    MultiGzDecoder::new(file)
        .read_to_string(&mut raw)
        .map_err(|err| CliError::io(context(), err))?;
    Ok(raw)
}

fn cells(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|cell| !cell.is_empty())
}

/// Parses a rank-2 matrix with comma and/or whitespace delimiters. Blank
/// lines are skipped; every remaining row must have the same width.
pub fn parse_matrix_text(raw: &str) -> Result<(Vec<f64>, usize, usize), BenchError> {
    let mut values = Vec::new();
    let mut width: Option<usize> = None;
    let mut n = 0;

    for (line_idx, line) in raw.lines().enumerate() {
        let before = values.len();
        for (col_idx, cell) in cells(line).enumerate() {
            let value = cell.parse::<f64>().map_err(|_| {
                BenchError::invalid_input(format!(
                    "line {} column {} is not a valid number: '{cell}'",
                    line_idx + 1,
                    col_idx + 1
                ))
            })?;
            values.push(value);
        }
        let row_width = values.len() - before;
        if row_width == 0 {
            continue;
        }
        match width {
            Some(expected) if expected != row_width => {
                return Err(BenchError::data_shape(format!(
                    "line {} has {row_width} columns but expected {expected}",
                    line_idx + 1
                )));
            }
            Some(_) => {}
            None => width = Some(row_width),
        }
        n += 1;
    }

    let d = width.ok_or_else(|| BenchError::data_shape("matrix input contains no rows"))?;
    Ok((values, n, d))
}

/// Parses a rank-1 vector of positive integer labels: one row or one column.
pub fn parse_label_text(raw: &str) -> Result<TrueLabels, BenchError> {
    let (values, n, d) = parse_matrix_text(raw)?;
    if n > 1 && d > 1 {
        return Err(BenchError::data_shape(format!(
            "label input must be a single row or column; got {n} x {d}"
        )));
    }

    let labels = values
        .iter()
        .enumerate()
        .map(|(idx, &value)| {
            if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= u32::MAX as f64
            {
                Ok(value as usize)
            } else {
                Err(BenchError::invalid_input(format!(
                    "label at index {idx} must be a positive integer; got {value}"
                )))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    TrueLabels::new(labels)
}

pub fn load_dataset(path: &Path) -> Result<LoadedDataset, CliError> {
    let raw = read_text(path)?;
    let (values, n, d) = parse_matrix_text(&raw)?;
    let dataset = LoadedDataset { values, n, d };
    dataset.view()?;
    tracing::debug!(path = %path.display(), n, d, "loaded dataset");
    Ok(dataset)
}

pub fn load_labels(path: &Path) -> Result<TrueLabels, CliError> {
    let raw = read_text(path)?;
    let labels = parse_label_text(&raw)?;
    tracing::debug!(
        path = %path.display(),
        n = labels.len(),
        k = labels.ground_truth_k(),
        "loaded true labels"
    );
    Ok(labels)
}

/// `{dir}/{name}_ks_range.labels.gz`
pub fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_ks_range.labels.gz"))
}

/// Header row of `k=<K>` cells followed by the comma-delimited label rows.
pub fn encode_matrix(matrix: &ResultMatrix) -> String {
    let mut out = matrix.header().join(",");
    out.push('\n');
    for row in matrix.rows() {
        let cells: Vec<String> = row.iter().map(usize::to_string).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Gzip-compresses the encoded matrix. The header carries no timestamp or
/// file name, so equal matrices produce equal bytes.
pub fn gzip_matrix(matrix: &ResultMatrix) -> Result<Vec<u8>, CliError> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::default());
    let context = "failed to gzip label matrix";
    encoder
        .write_all(encode_matrix(matrix).as_bytes())
        .map_err(|err| CliError::io(context, err))?;
    encoder.finish().map_err(|err| CliError::io(context, err))
}

/// Writes the gzip-compressed matrix through a temporary sibling file that is
/// renamed over `path`, so a failed write never leaves a partial output.
pub fn write_matrix_gz(path: &Path, matrix: &ResultMatrix) -> Result<(), CliError> {
    let encoded = gzip_matrix(matrix)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::usage(format!("invalid output path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(".{file_name}.tmp-{}", process::id()));

    let written = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(&encoded)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp_path, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(CliError::io(format!("failed to write {}", path.display()), err));
    }
    Ok(())
}
