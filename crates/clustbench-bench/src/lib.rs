// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic inputs shared by the clustbench benches.

use clustbench_core::{BenchError, TrueLabels};

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// `k` jittered Gaussian-like blobs of `per_blob` points in `d` dimensions,
/// with 1-based ground-truth labels.
pub fn blobs(k: usize, per_blob: usize, d: usize) -> Result<(Vec<f64>, TrueLabels), BenchError> {
    let mut state = 0x5eed_0c1a_57e2_beef_u64;
    let mut values = Vec::with_capacity(k * per_blob * d);
    let mut labels = Vec::with_capacity(k * per_blob);
    for blob in 0..k {
        for _ in 0..per_blob {
            for axis in 0..d {
                let center = if axis % 2 == 0 {
                    blob as f64 * 4.0
                } else {
                    (blob % 2) as f64 * 4.0
                };
                let jitter = (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
                values.push(center + jitter);
            }
            labels.push(blob + 1);
        }
    }
    Ok((values, TrueLabels::new(labels)?))
}

#[cfg(test)]
mod tests {
    use super::blobs;

    #[test]
    fn blobs_are_deterministic_and_labeled() {
        let (first, truth) = blobs(3, 5, 2).expect("blobs build");
        let (second, _) = blobs(3, 5, 2).expect("blobs build");
        assert_eq!(first, second);
        assert_eq!(first.len(), 30);
        assert_eq!(truth.ground_truth_k(), 3);
        assert!(first.iter().all(|v| v.is_finite()));
    }
}
