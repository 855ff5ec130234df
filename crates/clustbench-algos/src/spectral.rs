// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Spectral clustering: a dense affinity graph, its normalized spectral
//! embedding and k-means on the embedded rows.

use crate::kmeans::{self, KMeansParams};
use crate::linalg::{EigenConfig, dot, manhattan, squared_euclidean, top_eigenvectors};
use clustbench_core::{BenchError, Clusterer, DatasetView, RandomState};
use std::fmt;

/// Pairwise kernel used to build the affinity graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Affinity {
    /// `exp(-gamma * ||x - y||^2)`
    Rbf,
    /// `exp(-gamma * ||x - y||_1)`
    Laplacian,
    /// `(gamma * <x, y> + 1)^3`
    Poly,
    /// `tanh(gamma * <x, y> + 1)`
    Sigmoid,
}

impl Affinity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rbf => "rbf",
            Self::Laplacian => "laplacian",
            Self::Poly => "poly",
            Self::Sigmoid => "sigmoid",
        }
    }

    fn kernel(self, gamma: f64, x: &[f64], y: &[f64]) -> f64 {
        match self {
            Self::Rbf => (-gamma * squared_euclidean(x, y)).exp(),
            Self::Laplacian => (-gamma * manhattan(x, y)).exp(),
            Self::Poly => (gamma * dot(x, y) + 1.0).powi(3),
            Self::Sigmoid => (gamma * dot(x, y) + 1.0).tanh(),
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affinities swept by the `spectral` family, in enumeration order.
pub const SPECTRAL_AFFINITIES: [Affinity; 4] = [
    Affinity::Rbf,
    Affinity::Laplacian,
    Affinity::Poly,
    Affinity::Sigmoid,
];

/// Kernel coefficients swept by the `spectral` family, in enumeration order.
pub const SPECTRAL_GAMMAS: [f64; 5] = [0.25, 0.5, 1.0, 2.5, 5.0];

/// One cell of the `spectral` grid.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpectralParams {
    pub affinity: Affinity,
    pub gamma: f64,
}

impl Default for SpectralParams {
    fn default() -> Self {
        Self {
            affinity: Affinity::Rbf,
            gamma: 1.0,
        }
    }
}

impl From<(Affinity, f64)> for SpectralParams {
    fn from((affinity, gamma): (Affinity, f64)) -> Self {
        Self { affinity, gamma }
    }
}

impl SpectralParams {
    pub fn validate(&self) -> Result<(), BenchError> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(BenchError::invalid_input(format!(
                "SpectralParams.gamma must be finite and > 0; got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// The `spectral` family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Spectral;

impl Clusterer for Spectral {
    type Params = SpectralParams;

    fn name(&self) -> &'static str {
        "spectral"
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        params.validate()?;
        let n = data.n();
        let k = n_clusters;
        if k == 0 || k > n {
            return Err(BenchError::invalid_input(format!(
                "n_samples={n} should be >= n_clusters={k} (and n_clusters >= 1)"
            )));
        }

        let embedding = embed(data, k, params, rng)?;
        let embedded = DatasetView::new(&embedding, n, k)?;
        kmeans::fit(&embedded, k, &KMeansParams::default(), rng).map(|fit| fit.labels)
    }
}

/// Row-major `n x k` spectral embedding.
fn embed(
    data: &DatasetView<'_>,
    k: usize,
    params: &SpectralParams,
    rng: &mut RandomState,
) -> Result<Vec<f64>, BenchError> {
    let n = data.n();
    let mut graph = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let value = params.affinity.kernel(params.gamma, data.row(i), data.row(j));
            if !value.is_finite() {
                return Err(BenchError::numerical_issue(format!(
                    "{} affinity between rows {i} and {j} is not finite",
                    params.affinity
                )));
            }
            graph[i * n + j] = value;
            graph[j * n + i] = value;
        }
    }

    let mut scale = Vec::with_capacity(n);
    let mut isolated = 0usize;
    for (i, row) in graph.chunks_exact(n).enumerate() {
        let degree: f64 = row.iter().sum();
        if degree == 0.0 {
            isolated += 1;
            scale.push(1.0);
        } else if degree > 0.0 && degree.is_finite() {
            scale.push(degree.sqrt());
        } else {
            return Err(BenchError::numerical_issue(format!(
                "{} affinity graph has degree {degree} at row {i}",
                params.affinity
            )));
        }
    }
    if isolated > 0 {
        tracing::debug!(
            isolated,
            affinity = params.affinity.as_str(),
            gamma = params.gamma,
            "affinity graph is not fully connected"
        );
    }

    for i in 0..n {
        for j in 0..n {
            graph[i * n + j] /= scale[i] * scale[j];
        }
    }
    let shift = graph
        .chunks_exact(n)
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
        .fold(1.0, f64::max);
    for i in 0..n {
        graph[i * n + i] += shift;
    }

    let vectors = top_eigenvectors(&graph, n, k, EigenConfig::default(), rng.general())?;
    let mut embedding = vec![0.0; n * k];
    for (c, mut vector) in vectors.into_iter().enumerate() {
        for (value, s) in vector.iter_mut().zip(&scale) {
            *value /= s;
        }
        let pivot = vector
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for (row, value) in vector.into_iter().enumerate() {
            embedding[row * k + c] = sign * value;
        }
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(BenchError::numerical_issue(format!(
            "{} spectral embedding contains non-finite values",
            params.affinity
        )));
    }
    Ok(embedding)
}
