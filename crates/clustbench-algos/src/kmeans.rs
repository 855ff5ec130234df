// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! K-means with k-means++ seeding and Lloyd iterations.

use crate::linalg::{nearest_row, squared_euclidean};
use clustbench_core::{BenchError, Clusterer, DatasetView, RandomState};
use rand::Rng;

/// Fixed k-means configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KMeansParams {
    /// Independent k-means++ restarts; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence tolerance on total squared center shift, relative to the
    /// mean per-feature variance of the data.
    pub tol: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
        }
    }
}

impl KMeansParams {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.n_init == 0 {
            return Err(BenchError::invalid_input("KMeansParams.n_init must be >= 1"));
        }
        if self.max_iter == 0 {
            return Err(BenchError::invalid_input(
                "KMeansParams.max_iter must be >= 1",
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(BenchError::invalid_input(format!(
                "KMeansParams.tol must be finite and >= 0; got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// A fitted k-means solution.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    /// Row-major `k x d` centers.
    pub centers: Vec<f64>,
    pub inertia: f64,
    pub n_iter: usize,
}

/// The `kmeans` family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KMeans;

impl Clusterer for KMeans {
    type Params = KMeansParams;

    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        fit(data, n_clusters, params, rng).map(|fit| fit.labels)
    }
}

/// Runs `params.n_init` seeded restarts and keeps the lowest-inertia fit.
/// Seeding draws from the array generator of `rng`.
pub fn fit(
    data: &DatasetView<'_>,
    k: usize,
    params: &KMeansParams,
    rng: &mut RandomState,
) -> Result<KMeansFit, BenchError> {
    params.validate()?;
    let n = data.n();
    if k == 0 || k > n {
        return Err(BenchError::invalid_input(format!(
            "n_samples={n} should be >= n_clusters={k} (and n_clusters >= 1)"
        )));
    }

    let tol = scaled_tolerance(data, params.tol);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..params.n_init {
        let centers = kmeans_plus_plus(data, k, rng.array());
        let candidate = lloyd(data, centers, k, params.max_iter, tol);
        if best
            .as_ref()
            .map_or(true, |current| candidate.inertia < current.inertia)
        {
            best = Some(candidate);
        }
    }
    best.ok_or_else(|| BenchError::invalid_input("KMeansParams.n_init must be >= 1"))
}

fn scaled_tolerance(data: &DatasetView<'_>, tol: f64) -> f64 {
    let n = data.n() as f64;
    let d = data.d();
    let mut mean = vec![0.0; d];
    for row in data.rows() {
        for (m, value) in mean.iter_mut().zip(row) {
            *m += value / n;
        }
    }
    let mut variance = 0.0;
    for row in data.rows() {
        variance += squared_euclidean(row, &mean);
    }
    tol * variance / (n * d as f64)
}

/// D^2-weighted seeding.
fn kmeans_plus_plus<R: Rng + ?Sized>(data: &DatasetView<'_>, k: usize, rng: &mut R) -> Vec<f64> {
    let n = data.n();
    let mut centers = Vec::with_capacity(k * data.d());
    let first = rng.gen_range(0..n);
    centers.extend_from_slice(data.row(first));
    let mut closest: Vec<f64> = data
        .rows()
        .map(|row| squared_euclidean(row, data.row(first)))
        .collect();

    for _ in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 && total.is_finite() {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (idx, &dist) in closest.iter().enumerate() {
                acc += dist;
                if acc > target {
                    chosen = idx;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };

        let center = data.row(chosen);
        centers.extend_from_slice(center);
        for (dist, row) in closest.iter_mut().zip(data.rows()) {
            *dist = dist.min(squared_euclidean(row, center));
        }
    }
    centers
}

/// Assigns every row to its nearest center; returns per-row squared distances.
fn assign(data: &DatasetView<'_>, centers: &[f64], labels: &mut [usize]) -> Vec<f64> {
    data.rows()
        .zip(labels.iter_mut())
        .map(|(row, label)| {
            let (idx, dist) = nearest_row(row, centers, data.d());
            *label = idx;
            dist
        })
        .collect()
}

/// Recomputes centers as cluster means. An empty cluster is moved onto the
/// row currently farthest from its own center.
fn update(data: &DatasetView<'_>, labels: &[usize], k: usize, distances: &[f64]) -> Vec<f64> {
    let d = data.d();
    let mut sums = vec![0.0; k * d];
    let mut counts = vec![0usize; k];
    for (row, &label) in data.rows().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label * d..(label + 1) * d].iter_mut().zip(row) {
            *sum += value;
        }
    }

    let mut spare = distances.to_vec();
    for cluster in 0..k {
        let center = &mut sums[cluster * d..(cluster + 1) * d];
        if counts[cluster] == 0 {
            let far = spare
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (idx, &dist)| {
                    if dist > best.1 { (idx, dist) } else { best }
                })
                .0;
            spare[far] = f64::NEG_INFINITY;
            center.copy_from_slice(data.row(far));
        } else {
            let count = counts[cluster] as f64;
            for value in center.iter_mut() {
                *value /= count;
            }
        }
    }
    sums
}

fn lloyd(
    data: &DatasetView<'_>,
    mut centers: Vec<f64>,
    k: usize,
    max_iter: usize,
    tol: f64,
) -> KMeansFit {
    let mut labels = vec![0; data.n()];
    let mut n_iter = 0;
    for iter in 0..max_iter {
        let distances = assign(data, &centers, &mut labels);
        let next = update(data, &labels, k, &distances);
        let shift = squared_euclidean(&centers, &next);
        centers = next;
        n_iter = iter + 1;
        if shift <= tol {
            break;
        }
    }
    let inertia = assign(data, &centers, &mut labels).iter().sum();
    KMeansFit {
        labels,
        centers,
        inertia,
        n_iter,
    }
}
