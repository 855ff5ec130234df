// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use clustbench_algos::AlgorithmFamily;
use clustbench_core::{BenchmarkDriver, DatasetView, ExecutionContext, TrueLabels};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let n = common::bounded(cursor.next_u8(), 1, 24);
    let d = common::bounded(cursor.next_u8(), 1, 3);
    let max_k = common::bounded(cursor.next_u8(), 1, 6);

    let values: Vec<f64> = (0..n * d)
        .map(|_| f64::from(cursor.next_i16()) / 64.0)
        .collect();
    let labels: Vec<usize> = (0..n)
        .map(|_| common::bounded(cursor.next_u8(), 1, max_k))
        .collect();

    let Ok(dataset) = DatasetView::new(&values, n, d) else {
        return;
    };
    let Ok(truth) = TrueLabels::new(labels) else {
        return;
    };
    let Ok(runner) = AlgorithmFamily::Birch.build_runner(Some(123)) else {
        return;
    };

    let outcome = BenchmarkDriver::new(runner.as_ref())
        .run(&dataset, &truth, &ExecutionContext::new())
        .expect("a birch sweep over valid inputs always completes");
    assert_eq!(outcome.matrix.n_rows(), n);
    for (col, &target) in outcome.matrix.targets().iter().enumerate() {
        assert!(outcome
            .matrix
            .column(col)
            .iter()
            .all(|&label| (1..=target).contains(&label)));
    }
});
