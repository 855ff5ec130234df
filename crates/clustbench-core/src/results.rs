// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::BenchError;
use crate::slots::{SLOT_COUNT, SlotTable};

/// Where a slot's accepted labeling came from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Provenance {
    /// A clustering attempt under the described configuration.
    Attempt { config: String },
    /// Every point labeled with the slot's target K.
    CollapseFallback,
    /// Every point labeled 1.
    SingleClusterFallback,
}

/// The labeling kept for one slot, 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedResult {
    pub labels: Vec<usize>,
    pub provenance: Provenance,
}

impl AcceptedResult {
    pub fn attempt(labels: Vec<usize>, config: impl Into<String>) -> Self {
        Self {
            labels,
            provenance: Provenance::Attempt {
                config: config.into(),
            },
        }
    }

    pub fn collapse(n: usize, k: usize) -> Self {
        Self {
            labels: vec![k; n],
            provenance: Provenance::CollapseFallback,
        }
    }

    pub fn single_cluster(n: usize) -> Self {
        Self {
            labels: vec![1; n],
            provenance: Provenance::SingleClusterFallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self.provenance, Provenance::Attempt { .. })
    }
}

/// N x 5 accepted labels with the per-column target header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultMatrix {
    targets: [usize; SLOT_COUNT],
    columns: Vec<Vec<usize>>,
}

impl ResultMatrix {
    /// Assembles the matrix from one accepted result per slot, in slot order.
    pub fn new(slots: &SlotTable, accepted: Vec<AcceptedResult>) -> Result<Self, BenchError> {
        if accepted.len() != SLOT_COUNT {
            return Err(BenchError::invalid_input(format!(
                "result matrix needs {SLOT_COUNT} columns; got {}",
                accepted.len()
            )));
        }
        let targets = slots.targets();
        let n = accepted[0].labels.len();
        if n == 0 {
            return Err(BenchError::invalid_input("result matrix needs at least one row"));
        }

        let mut columns = Vec::with_capacity(SLOT_COUNT);
        for (slot, result) in accepted.into_iter().enumerate() {
            if result.labels.len() != n {
                return Err(BenchError::invalid_input(format!(
                    "column {slot} has {} rows; expected {n}",
                    result.labels.len()
                )));
            }
            let k = targets[slot];
            if let Some(bad) = result.labels.iter().find(|&&label| label < 1 || label > k) {
                return Err(BenchError::invalid_input(format!(
                    "column {slot} label {bad} outside [1, {k}]"
                )));
            }
            columns.push(result.labels);
        }

        Ok(Self { targets, columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns[0].len()
    }

    pub fn n_cols(&self) -> usize {
        SLOT_COUNT
    }

    pub fn targets(&self) -> [usize; SLOT_COUNT] {
        self.targets
    }

    /// Header cells `k=<K>` in slot order.
    pub fn header(&self) -> Vec<String> {
        self.targets.iter().map(|k| format!("k={k}")).collect()
    }

    pub fn column(&self, slot: usize) -> &[usize] {
        &self.columns[slot]
    }

    pub fn row(&self, i: usize) -> [usize; SLOT_COUNT] {
        std::array::from_fn(|slot| self.columns[slot][i])
    }

    pub fn rows(&self) -> impl Iterator<Item = [usize; SLOT_COUNT]> + '_ {
        (0..self.n_rows()).map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::{AcceptedResult, Provenance, ResultMatrix};
    use crate::slots::generate_slots;

    fn columns(n: usize) -> Vec<AcceptedResult> {
        (0..5).map(|_| AcceptedResult::single_cluster(n)).collect()
    }

    #[test]
    fn fallbacks_have_requested_shape() {
        let collapse = AcceptedResult::collapse(4, 3);
        assert_eq!(collapse.labels, vec![3, 3, 3, 3]);
        assert_eq!(collapse.provenance, Provenance::CollapseFallback);
        assert!(collapse.is_fallback());

        let single = AcceptedResult::single_cluster(3);
        assert_eq!(single.labels, vec![1, 1, 1]);
        assert!(single.is_fallback());

        assert!(!AcceptedResult::attempt(vec![1, 2], "n_init=10").is_fallback());
    }

    #[test]
    fn matrix_exposes_header_rows_and_columns() {
        let slots = generate_slots(2).expect("k=2");
        let mut accepted = columns(3);
        accepted[4] = AcceptedResult::attempt(vec![1, 4, 2], "cfg");
        let matrix = ResultMatrix::new(&slots, accepted).expect("valid matrix");

        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.n_cols(), 5);
        assert_eq!(matrix.header(), vec!["k=2", "k=2", "k=2", "k=3", "k=4"]);
        assert_eq!(matrix.column(4), &[1, 4, 2]);
        assert_eq!(matrix.row(1), [1, 1, 1, 1, 4]);
        assert_eq!(matrix.rows().count(), 3);
    }

    #[test]
    fn matrix_rejects_ragged_or_out_of_range_columns() {
        let slots = generate_slots(2).expect("k=2");

        let mut ragged = columns(3);
        ragged[2] = AcceptedResult::single_cluster(2);
        let err = ResultMatrix::new(&slots, ragged).expect_err("ragged columns must fail");
        assert!(err.to_string().contains("column 2 has 2 rows"));

        let mut out_of_range = columns(3);
        out_of_range[0] = AcceptedResult::attempt(vec![1, 3, 2], "cfg");
        let err = ResultMatrix::new(&slots, out_of_range).expect_err("label 3 > K=2 must fail");
        assert!(err.to_string().contains("outside [1, 2]"));

        let err = ResultMatrix::new(&slots, columns(3)[..4].to_vec())
            .expect_err("four columns must fail");
        assert!(err.to_string().contains("needs 5 columns"));
    }
}
