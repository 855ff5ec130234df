// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use clustbench_cli::io::{parse_label_text, parse_matrix_text};
use clustbench_core::DatasetView;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    if let Ok((values, n, d)) = parse_matrix_text(&raw) {
        assert_eq!(values.len(), n * d);
        assert!(n >= 1 && d >= 1);
        let _ = DatasetView::new(&values, n, d);
    }

    if let Ok(labels) = parse_label_text(&raw) {
        assert!(!labels.is_empty());
        assert!(labels.as_slice().iter().all(|&label| label >= 1));
        assert_eq!(
            labels.ground_truth_k(),
            labels.as_slice().iter().copied().max().unwrap_or(0)
        );
    }
});
