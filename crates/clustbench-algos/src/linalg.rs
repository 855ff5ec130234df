// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Small dense linear-algebra kernels over row-major `f64` buffers.

use clustbench_core::BenchError;
use rand::Rng;

pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Index of the row in `centers` (row-major, `d` columns) closest to `point`
/// in squared Euclidean distance, with that distance. Ties go to the lowest
/// index.
pub fn nearest_row(point: &[f64], centers: &[f64], d: usize) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, center) in centers.chunks_exact(d).enumerate() {
        let dist = squared_euclidean(point, center);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

/// Lower-triangular Cholesky factor of the symmetric `d x d` matrix `a`.
pub fn cholesky(a: &[f64], d: usize) -> Result<Vec<f64>, BenchError> {
    let mut l = vec![0.0; d * d];
    for i in 0..d {
        for j in 0..=i {
            let mut sum = a[i * d + j];
            for k in 0..j {
                sum -= l[i * d + k] * l[j * d + k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return Err(BenchError::numerical_issue(format!(
                        "matrix is not positive definite (pivot {i} = {sum})"
                    )));
                }
                l[i * d + i] = sum.sqrt();
            } else {
                l[i * d + j] = sum / l[j * d + j];
            }
        }
    }
    Ok(l)
}

/// Solves `L y = b` for lower-triangular `l`.
pub fn solve_lower(l: &[f64], d: usize, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; d];
    for i in 0..d {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * d + k] * y[k];
        }
        y[i] = sum / l[i * d + i];
    }
    y
}

/// `log det(A)` from the Cholesky factor of `A`.
pub fn log_det_cholesky(l: &[f64], d: usize) -> f64 {
    (0..d).map(|i| l[i * d + i].ln()).sum::<f64>() * 2.0
}

/// Numerically stable `log(sum(exp(values)))`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Orthonormalizes `columns` in place with modified Gram-Schmidt.
pub fn orthonormalize(columns: &mut [Vec<f64>]) -> Result<(), BenchError> {
    for i in 0..columns.len() {
        let (done, rest) = columns.split_at_mut(i);
        let column = &mut rest[0];
        for basis in done.iter() {
            let projection = dot(column, basis);
            for (value, b) in column.iter_mut().zip(basis) {
                *value -= projection * b;
            }
        }
        let norm = dot(column, column).sqrt();
        if norm <= 1e-12 || !norm.is_finite() {
            return Err(BenchError::numerical_issue(format!(
                "subspace collapsed at column {i} during orthogonalization"
            )));
        }
        for value in column.iter_mut() {
            *value /= norm;
        }
    }
    Ok(())
}

/// Settings for [`top_eigenvectors`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenConfig {
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tol: 1e-9,
        }
    }
}

/// Eigenvectors for the `k` largest eigenvalues of the symmetric positive
/// semi-definite `n x n` matrix `m`, via orthogonal iteration started from a
/// random basis. Returns `k` columns of length `n`, ordered by decreasing
/// Rayleigh quotient.
pub fn top_eigenvectors<R: Rng + ?Sized>(
    m: &[f64],
    n: usize,
    k: usize,
    config: EigenConfig,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>, BenchError> {
    if k == 0 || k > n {
        return Err(BenchError::invalid_input(format!(
            "cannot extract {k} eigenvectors from a {n}x{n} matrix"
        )));
    }

    let mut basis: Vec<Vec<f64>> = (0..k)
        .map(|_| (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    orthonormalize(&mut basis)?;

    for _ in 0..config.max_iter {
        let mut next: Vec<Vec<f64>> = basis.iter().map(|column| mat_vec(m, n, column)).collect();
        orthonormalize(&mut next)?;
        let change = basis
            .iter()
            .zip(&next)
            .map(|(old, new)| column_change(old, new))
            .fold(0.0, f64::max);
        basis = next;
        if change < config.tol {
            break;
        }
    }

    let mut ranked: Vec<(f64, Vec<f64>)> = basis
        .into_iter()
        .map(|column| (dot(&column, &mat_vec(m, n, &column)), column))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(ranked.into_iter().map(|(_, column)| column).collect())
}

/// Distance between two unit columns, ignoring sign.
fn column_change(old: &[f64], new: &[f64]) -> f64 {
    let (same, flipped) = old.iter().zip(new).fold((0.0, 0.0), |(same, flipped), (o, n)| {
        (same + (n - o) * (n - o), flipped + (n + o) * (n + o))
    });
    f64::min(same, flipped).sqrt()
}

fn mat_vec(m: &[f64], n: usize, v: &[f64]) -> Vec<f64> {
    m.chunks_exact(n).map(|row| dot(row, v)).collect()
}
