// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::BenchError;

/// Borrowed row-major N x D matrix with finite values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DatasetView<'a> {
    values: &'a [f64],
    n: usize,
    d: usize,
}

impl<'a> DatasetView<'a> {
    /// Validates shape and finiteness, then borrows `values` as an `n x d`
    /// row-major matrix.
    pub fn new(values: &'a [f64], n: usize, d: usize) -> Result<Self, BenchError> {
        if n == 0 {
            return Err(BenchError::data_shape("dataset must have at least one row"));
        }
        if d == 0 {
            return Err(BenchError::data_shape(
                "dataset must have at least one column",
            ));
        }
        let expected = n.checked_mul(d).ok_or_else(|| {
            BenchError::data_shape(format!("dataset shape overflow: n={n}, d={d}"))
        })?;
        if values.len() != expected {
            return Err(BenchError::data_shape(format!(
                "dataset length mismatch: got {}, expected n*d={expected} (n={n}, d={d})",
                values.len()
            )));
        }
        if let Some(idx) = values.iter().position(|value| !value.is_finite()) {
            return Err(BenchError::invalid_input(format!(
                "dataset value at row {}, column {} is not finite",
                idx / d,
                idx % d
            )));
        }
        Ok(Self { values, n, d })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Row `i`. Panics when `i >= n`, like slice indexing.
    pub fn row(&self, i: usize) -> &'a [f64] {
        &self.values[i * self.d..(i + 1) * self.d]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &'a [f64]> + 'a {
        self.values.chunks_exact(self.d)
    }
}

/// Ground-truth labeling: a non-empty vector of positive integers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrueLabels {
    labels: Vec<usize>,
}

impl TrueLabels {
    pub fn new(labels: Vec<usize>) -> Result<Self, BenchError> {
        if labels.is_empty() {
            return Err(BenchError::invalid_input("true labels must not be empty"));
        }
        if let Some(idx) = labels.iter().position(|&label| label == 0) {
            return Err(BenchError::invalid_input(format!(
                "true labels must be positive integers; label at index {idx} is 0"
            )));
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }

    /// The ground-truth cluster count `k`: the maximum label.
    pub fn ground_truth_k(&self) -> usize {
        self.labels.iter().copied().max().unwrap_or(0)
    }
}
