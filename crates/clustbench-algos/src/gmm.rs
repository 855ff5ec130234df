// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Full-covariance Gaussian mixture fitted with EM.

use crate::kmeans::{self, KMeansParams};
use crate::linalg::{cholesky, log_det_cholesky, log_sum_exp, solve_lower};
use clustbench_core::{BenchError, Clusterer, DatasetView, RandomState};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Fixed mixture configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GmmParams {
    /// EM restarts, each initialized from a one-restart k-means; the highest
    /// lower bound wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold on the change of the per-sample lower bound.
    pub tol: f64,
    /// Added to every covariance diagonal.
    pub reg_covar: f64,
}

impl Default for GmmParams {
    fn default() -> Self {
        Self {
            n_init: 100,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
        }
    }
}

impl GmmParams {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.n_init == 0 {
            return Err(BenchError::invalid_input("GmmParams.n_init must be >= 1"));
        }
        if self.max_iter == 0 {
            return Err(BenchError::invalid_input("GmmParams.max_iter must be >= 1"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(BenchError::invalid_input(format!(
                "GmmParams.tol must be finite and >= 0; got {}",
                self.tol
            )));
        }
        if !self.reg_covar.is_finite() || self.reg_covar < 0.0 {
            return Err(BenchError::invalid_input(format!(
                "GmmParams.reg_covar must be finite and >= 0; got {}",
                self.reg_covar
            )));
        }
        Ok(())
    }
}

/// The `gm` family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GaussianMixture;

struct Mixture {
    log_weights: Vec<f64>,
    /// Row-major `k x d`.
    means: Vec<f64>,
    /// Lower Cholesky factor of each component covariance.
    factors: Vec<Vec<f64>>,
    log_dets: Vec<f64>,
}

impl Clusterer for GaussianMixture {
    type Params = GmmParams;

    fn name(&self) -> &'static str {
        "gm"
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
                "n_samples={n} should be >= n_components={k} (and n_components >= 1)"
            )));
        }

        let init_params = KMeansParams {
            n_init: 1,
            ..KMeansParams::default()
        };
        let mut best: Option<(f64, Mixture)> = None;
        for init in 0..params.n_init {
            let init_labels = kmeans::fit(data, k, &init_params, rng)?.labels;
            let mut resp = vec![0.0; n * k];
            for (i, &label) in init_labels.iter().enumerate() {
                resp[i * k + label] = 1.0;
            }
            let mut mixture = m_step(data, &resp, k, params.reg_covar)?;

            let mut lower_bound = f64::NEG_INFINITY;
            let mut converged = false;
            for _ in 0..params.max_iter {
                let previous = lower_bound;
                let (log_resp, bound) = e_step(data, &mixture);
                lower_bound = bound;
                for (r, log_r) in resp.iter_mut().zip(&log_resp) {
                    *r = log_r.exp();
                }
                mixture = m_step(data, &resp, k, params.reg_covar)?;
                if (lower_bound - previous).abs() < params.tol {
                    converged = true;
                    break;
                }
            }
            if !converged {
                tracing::debug!(init, lower_bound, "gaussian mixture restart did not converge");
            }

            if best
                .as_ref()
                .map_or(true, |(current, _)| lower_bound > *current)
            {
                best = Some((lower_bound, mixture));
            }
        }

        let (_, mixture) =
            best.ok_or_else(|| BenchError::invalid_input("GmmParams.n_init must be >= 1"))?;
        let (log_resp, _) = e_step(data, &mixture);
        Ok(log_resp
            .chunks_exact(k)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (idx, &value)| {
                        if value > best.1 { (idx, value) } else { best }
                    })
                    .0
            })
            .collect())
    }
}

fn m_step(
    data: &DatasetView<'_>,
    resp: &[f64],
    k: usize,
    reg_covar: f64,
) -> Result<Mixture, BenchError> {
    let d = data.d();
    let mut nk = vec![10.0 * f64::EPSILON; k];
    let mut means = vec![0.0; k * d];
    for (row, weights) in data.rows().zip(resp.chunks_exact(k)) {
        for (j, &w) in weights.iter().enumerate() {
            nk[j] += w;
            for (mean, value) in means[j * d..(j + 1) * d].iter_mut().zip(row) {
                *mean += w * value;
            }
        }
    }
    for j in 0..k {
        for mean in &mut means[j * d..(j + 1) * d] {
            *mean /= nk[j];
        }
    }

    let mut factors = Vec::with_capacity(k);
    let mut log_dets = Vec::with_capacity(k);
    let mut diff = vec![0.0; d];
    for j in 0..k {
        let mean = &means[j * d..(j + 1) * d];
        let mut cov = vec![0.0; d * d];
        for (row, weights) in data.rows().zip(resp.chunks_exact(k)) {
            let w = weights[j];
            if w == 0.0 {
                continue;
            }
            for ((slot, value), mu) in diff.iter_mut().zip(row).zip(mean) {
                *slot = value - mu;
            }
            for a in 0..d {
                for b in 0..=a {
                    cov[a * d + b] += w * diff[a] * diff[b];
                }
            }
        }
        for a in 0..d {
            for b in 0..=a {
                let value = cov[a * d + b] / nk[j];
                cov[a * d + b] = value;
                cov[b * d + a] = value;
            }
            cov[a * d + a] += reg_covar;
        }
        let factor = cholesky(&cov, d).map_err(|_| {
            BenchError::numerical_issue(format!(
                "covariance of component {j} is not positive definite; increase reg_covar"
            ))
        })?;
        log_dets.push(log_det_cholesky(&factor, d));
        factors.push(factor);
    }

    let total: f64 = nk.iter().sum();
    Ok(Mixture {
        log_weights: nk.iter().map(|w| (w / total).ln()).collect(),
        means,
        factors,
        log_dets,
    })
}

/// Log responsibilities (row-major `n x k`) and the mean log-likelihood.
fn e_step(data: &DatasetView<'_>, mixture: &Mixture) -> (Vec<f64>, f64) {
    let d = data.d();
    let k = mixture.log_weights.len();
    let mut log_resp = Vec::with_capacity(data.n() * k);
    let mut total = 0.0;
    let mut diff = vec![0.0; d];
    let mut row_log_prob = vec![0.0; k];
    for row in data.rows() {
        for j in 0..k {
            let mean = &mixture.means[j * d..(j + 1) * d];
            for ((slot, value), mu) in diff.iter_mut().zip(row).zip(mean) {
                *slot = value - mu;
            }
            let whitened = solve_lower(&mixture.factors[j], d, &diff);
            let mahalanobis: f64 = whitened.iter().map(|v| v * v).sum();
            row_log_prob[j] = mixture.log_weights[j]
                - 0.5 * (d as f64 * LN_2PI + mixture.log_dets[j] + mahalanobis);
        }
        let norm = log_sum_exp(&row_log_prob);
        total += norm;
        log_resp.extend(row_log_prob.iter().map(|lp| lp - norm));
    }
    (log_resp, total / data.n() as f64)
}

#[cfg(test)]
mod tests {
    use super::{GaussianMixture, GmmParams};
    use clustbench_core::{Clusterer, DatasetView, RandomState};

    fn two_blobs() -> Vec<f64> {
        let mut values = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (8.0, 8.0)] {
            for i in 0..10 {
                let dx = (i % 5) as f64 * 0.1;
                let dy = (i / 5) as f64 * 0.15 + (i % 3) as f64 * 0.02;
                values.extend_from_slice(&[cx + dx, cy + dy]);
            }
        }
        values
    }

    fn quick() -> GmmParams {
        GmmParams {
            n_init: 3,
            ..GmmParams::default()
        }
    }

    #[test]
    fn separates_two_gaussian_blobs() {
        let values = two_blobs();
        let data = DatasetView::new(&values, 20, 2).expect("valid dataset");
        let labels = GaussianMixture
            .fit_predict(&data, 2, &quick(), &mut RandomState::from_seed(123))
            .expect("mixture fits");
        assert!(labels[..10].iter().all(|&label| label == labels[0]));
        assert!(labels[10..].iter().all(|&label| label == labels[10]));
        assert_ne!(labels[0], labels[10]);
    }

    #[test]
    fn labels_are_reproducible_under_the_same_seed() {
        let values = two_blobs();
        let data = DatasetView::new(&values, 20, 2).expect("valid dataset");
        let first = GaussianMixture
            .fit_predict(&data, 3, &quick(), &mut RandomState::from_seed(7))
            .expect("mixture fits");
        let second = GaussianMixture
            .fit_predict(&data, 3, &quick(), &mut RandomState::from_seed(7))
            .expect("mixture fits");
        assert_eq!(first, second);
        assert!(first.iter().all(|&label| label < 3));
    }

    #[test]
    fn zero_regularization_on_duplicated_points_is_a_numerical_issue() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 3.0];
        let data = DatasetView::new(&values, 4, 2).expect("valid dataset");
        let params = GmmParams {
            reg_covar: 0.0,
            ..quick()
        };
        let err = GaussianMixture
            .fit_predict(&data, 2, &params, &mut RandomState::from_seed(1))
            .expect_err("singular covariance must fail");
        assert!(err.to_string().contains("not positive definite"));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let values = [1.0, 2.0];
        let data = DatasetView::new(&values, 2, 1).expect("valid dataset");
        let err = GaussianMixture
            .fit_predict(&data, 3, &quick(), &mut RandomState::default())
            .expect_err("k > n must fail");
        assert!(err.to_string().contains("n_components=3"));

        let err = GmmParams {
            reg_covar: -1.0,
            ..GmmParams::default()
        }
        .validate()
        .expect_err("negative reg_covar must fail");
        assert!(err.to_string().contains("reg_covar"));
    }
}
