// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clustbench_algos::{AlgorithmFamily, run_family};
use clustbench_core::{
    AcceptancePolicy, BenchError, DatasetView, ExecutionContext, ResultMatrix, TrueLabels,
};

const PER_BLOB: usize = 12;
const CENTERS: [(f64, f64); 3] = [(0.0, 0.0), (6.0, 6.0), (12.0, 0.0)];

fn blobs() -> (Vec<f64>, Vec<usize>) {
    let mut values = Vec::new();
    let mut truth = Vec::new();
    for (blob, (cx, cy)) in CENTERS.iter().enumerate() {
        for i in 0..PER_BLOB {
            let dx = (i % 4) as f64 * 0.12 + (i % 3) as f64 * 0.01;
            let dy = (i / 4) as f64 * 0.12;
            values.extend_from_slice(&[cx + dx, cy + dy]);
            truth.push(blob + 1);
        }
    }
    (values, truth)
}

fn assert_complete(matrix: &ResultMatrix, n: usize) {
    assert_eq!(matrix.n_rows(), n);
    assert_eq!(matrix.n_cols(), 5);
    assert_eq!(matrix.header(), vec!["k=2", "k=2", "k=3", "k=4", "k=5"]);
    for (col, &target) in matrix.targets().iter().enumerate() {
        assert!(
            matrix
                .column(col)
                .iter()
                .all(|&label| (1..=target).contains(&label)),
            "column {col} has labels outside 1..={target}"
        );
    }
}

#[test]
fn every_family_emits_a_complete_matrix() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    for family in AlgorithmFamily::ALL {
        let outcome = run_family(
            family.as_str(),
            &data,
            &truth,
            Some(123),
            &ExecutionContext::new(),
        )
        .expect("benchmark runs");
        assert_complete(&outcome.matrix, n);
        assert_eq!(outcome.diagnostics.algorithm, family.as_str());
        assert_eq!(outcome.diagnostics.policy, family.policy());
        assert_eq!(outcome.diagnostics.ground_truth_k, 3);
        assert_eq!(outcome.diagnostics.slots.len(), 5);
    }
}

#[test]
fn repeated_runs_with_one_seed_are_identical() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    for family in AlgorithmFamily::ALL {
        let first = run_family(family.as_str(), &data, &truth, Some(5), &ExecutionContext::new())
            .expect("first run");
        let second = run_family(family.as_str(), &data, &truth, Some(5), &ExecutionContext::new())
            .expect("second run");
        assert_eq!(first.matrix, second.matrix, "{family}");
    }
}

#[test]
fn kmeans_recovers_the_true_partition_at_the_true_k() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    let outcome = run_family("kmeans", &data, &truth, Some(123), &ExecutionContext::new())
        .expect("kmeans runs");
    let column = outcome.matrix.column(2);
    for blob in column.chunks(PER_BLOB) {
        assert!(blob.iter().all(|&label| label == blob[0]));
    }
    assert_ne!(column[0], column[PER_BLOB]);
    assert_ne!(column[PER_BLOB], column[2 * PER_BLOB]);
    assert_ne!(column[0], column[2 * PER_BLOB]);
    assert!(outcome.diagnostics.warnings.is_empty());
}

#[test]
fn spectral_accepts_a_qualifying_configuration_for_the_true_k() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    let outcome = run_family("spectral", &data, &truth, Some(123), &ExecutionContext::new())
        .expect("spectral runs");
    assert_eq!(outcome.diagnostics.policy, AcceptancePolicy::FirstWins);
    let slot = &outcome.diagnostics.slots[2];
    assert!(slot.accepted_config.is_some());
    let mut distinct = outcome.matrix.column(2).to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct, vec![1, 2, 3]);
}

#[test]
fn accepted_configs_name_the_grid_cell_parameters() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    let birch = run_family("birch", &data, &truth, Some(123), &ExecutionContext::new())
        .expect("birch runs");
    let config = birch.diagnostics.slots[2]
        .accepted_config
        .as_deref()
        .expect("birch satisfies the true k");
    assert!(
        config.starts_with("BirchParams { branching_factor: "),
        "unexpected config {config}"
    );
    assert!(config.contains("threshold: "));

    let spectral = run_family("spectral", &data, &truth, Some(123), &ExecutionContext::new())
        .expect("spectral runs");
    let config = spectral.diagnostics.slots[2]
        .accepted_config
        .as_deref()
        .expect("spectral satisfies the true k");
    assert!(
        config.starts_with("SpectralParams { affinity: "),
        "unexpected config {config}"
    );
}

#[test]
fn unknown_family_fails_before_clustering() {
    let (values, truth) = blobs();
    let n = truth.len();
    let data = DatasetView::new(&values, n, 2).expect("valid dataset");
    let truth = TrueLabels::new(truth).expect("valid labels");

    let err = run_family("hdbscan", &data, &truth, Some(123), &ExecutionContext::new())
        .expect_err("unknown family must fail");
    assert!(matches!(err, BenchError::Configuration(_)));
    assert_eq!(err.code(), "configuration_error");
}

#[test]
fn truth_length_mismatch_is_a_data_shape_error() {
    let (values, _) = blobs();
    let data = DatasetView::new(&values, 3 * PER_BLOB, 2).expect("valid dataset");
    let truth = TrueLabels::new(vec![1, 2, 3]).expect("valid labels");

    let err = run_family("birch", &data, &truth, Some(123), &ExecutionContext::new())
        .expect_err("mismatched labels must fail");
    assert!(matches!(err, BenchError::DataShape(_)));
}
