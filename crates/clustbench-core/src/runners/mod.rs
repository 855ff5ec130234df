// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Acceptance-policy runners.
//!
//! Every runner produces exactly one [`AcceptedResult`] per slot. Attempts
//! that fail or do not meet the runner's acceptance rule are recorded in the
//! slot's [`SlotDiagnostics`] and never surface as errors; the only errors a
//! runner returns are cancellation and invalid runner input.

mod first_wins;
mod fixed;
mod last_wins;

pub use first_wins::FirstWinsGridRunner;
pub use fixed::FixedConfigRunner;
pub use last_wins::LastWinsGridRunner;

use crate::BenchError;
use crate::capability::Clusterer;
use crate::dataset::DatasetView;
use crate::diagnostics::{FallbackKind, SlotDiagnostics};
use crate::execution_context::ExecutionContext;
use crate::repro::RandomState;
use crate::results::AcceptedResult;
use crate::slots::{KSlot, SlotTable};
use std::fmt::Debug;

/// Rule deciding which attempt a slot keeps.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcceptancePolicy {
    /// One attempt per slot under a fixed configuration.
    Fixed,
    /// Exhaustive grid sweep; the last qualifying attempt wins.
    LastWins,
    /// Short-circuit grid sweep; the first qualifying attempt wins.
    FirstWins,
}

impl AcceptancePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::LastWins => "last_wins",
            Self::FirstWins => "first_wins",
        }
    }
}

impl std::fmt::Display for AcceptancePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a runner: accepted labelings and attempt ledgers in slot order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRun {
    pub accepted: Vec<AcceptedResult>,
    pub slots: Vec<SlotDiagnostics>,
    pub used_parallel: bool,
}

/// Object-safe runner interface used by the driver.
pub trait SlotRunner: Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn policy(&self) -> AcceptancePolicy;

    fn seed(&self) -> Option<u64>;

    fn run(
        &self,
        data: &DatasetView<'_>,
        slots: &SlotTable,
        rng: &mut RandomState,
        ctx: &ExecutionContext<'_>,
    ) -> Result<SlotRun, BenchError>;
}

/// Two explicitly ordered hyperparameter axes. Cells enumerate axis A outer,
/// axis B inner.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterGrid<A, B> {
    axis_a: Vec<A>,
    axis_b: Vec<B>,
}

impl<A, B> ParameterGrid<A, B> {
    pub fn new(axis_a: Vec<A>, axis_b: Vec<B>) -> Result<Self, BenchError> {
        if axis_a.is_empty() || axis_b.is_empty() {
            return Err(BenchError::invalid_input(format!(
                "parameter grid axes must be non-empty; got {} x {}",
                axis_a.len(),
                axis_b.len()
            )));
        }
        Ok(Self { axis_a, axis_b })
    }

    pub fn axis_a(&self) -> &[A] {
        &self.axis_a
    }

    pub fn axis_b(&self) -> &[B] {
        &self.axis_b
    }

    pub fn len(&self) -> usize {
        self.axis_a.len() * self.axis_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells in canonical enumeration order.
    pub fn cells(&self) -> impl Iterator<Item = (&A, &B)> + '_ {
        self.axis_a
            .iter()
            .flat_map(move |a| self.axis_b.iter().map(move |b| (a, b)))
    }
}

/// Runs one attempt inside a seed scope and returns 1-based labels.
///
/// A labeling of the wrong length is reported as a failure.
pub(crate) fn run_attempt<C: Clusterer>(
    clusterer: &C,
    data: &DatasetView<'_>,
    n_clusters: usize,
    params: &C::Params,
    seed: Option<u64>,
    rng: &mut RandomState,
) -> Result<Vec<usize>, BenchError> {
    let labels =
        rng.with_seed(seed, |state| clusterer.fit_predict(data, n_clusters, params, state))?;
    shift_labels(labels, data.n())
}

pub(crate) fn shift_labels(labels: Vec<usize>, n: usize) -> Result<Vec<usize>, BenchError> {
    if labels.len() != n {
        return Err(BenchError::invalid_input(format!(
            "labeling has {} entries; expected n={n}",
            labels.len()
        )));
    }
    labels
        .into_iter()
        .map(|label| label.checked_add(1))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| BenchError::invalid_input("label value overflows when shifted to 1-based"))
}

/// Minimum, maximum and distinct count of a 1-based labeling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LabelSummary {
    pub min: usize,
    pub max: usize,
    pub distinct: usize,
}

impl LabelSummary {
    pub fn of(labels: &[usize]) -> Self {
        let mut sorted = labels.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            min: sorted.first().copied().unwrap_or(0),
            max: sorted.last().copied().unwrap_or(0),
            distinct: sorted.len(),
        }
    }
}

pub(crate) fn describe<P: Debug>(params: &P) -> String {
    format!("{params:?}")
}

/// Per-slot accepted state and attempt counters, shared by all runners.
pub(crate) struct SweepLedger {
    algorithm: &'static str,
    n: usize,
    accepted: Vec<Option<AcceptedResult>>,
    slots: Vec<SlotDiagnostics>,
}

impl SweepLedger {
    pub fn new(algorithm: &'static str, n: usize, table: &SlotTable) -> Self {
        Self {
            algorithm,
            n,
            accepted: table.iter().map(|_| None).collect(),
            slots: table
                .iter()
                .map(|(slot, target)| SlotDiagnostics::new(slot.id(), target))
                .collect(),
        }
    }

    pub fn record_failure(&mut self, slot: KSlot, config: &str, err: &BenchError) {
        let entry = &mut self.slots[slot.id()];
        entry.attempts += 1;
        entry.failures += 1;
        tracing::debug!(
            algorithm = self.algorithm,
            slot = slot.id(),
            target = entry.target,
            config,
            error = %err,
            "clustering attempt failed"
        );
    }

    pub fn record_rejection(&mut self, slot: KSlot, config: &str, summary: LabelSummary) {
        let entry = &mut self.slots[slot.id()];
        entry.attempts += 1;
        entry.rejections += 1;
        tracing::debug!(
            algorithm = self.algorithm,
            slot = slot.id(),
            target = entry.target,
            config,
            min = summary.min,
            max = summary.max,
            distinct = summary.distinct,
            "clustering attempt did not qualify"
        );
    }

    /// Stores `labels` as the slot's result, replacing any earlier one.
    pub fn accept(&mut self, slot: KSlot, labels: Vec<usize>, config: String) {
        let entry = &mut self.slots[slot.id()];
        entry.attempts += 1;
        entry.accepted_config = Some(config.clone());
        self.accepted[slot.id()] = Some(AcceptedResult::attempt(labels, config));
    }

    /// Fills unsatisfied slots with `fallback` and returns the run.
    pub fn finish(self, fallback: FallbackKind, used_parallel: bool) -> SlotRun {
        let Self {
            algorithm,
            n,
            accepted,
            mut slots,
        } = self;

        let accepted = accepted
            .into_iter()
            .zip(slots.iter_mut())
            .map(|(result, entry)| match result {
                Some(result) => result,
                None => {
                    tracing::warn!(
                        algorithm,
                        slot = entry.slot,
                        target = entry.target,
                        attempts = entry.attempts,
                        fallback = ?fallback,
                        "no attempt qualified; substituting fallback labeling"
                    );
                    entry.accepted_config = None;
                    entry.fallback = Some(fallback);
                    match fallback {
                        FallbackKind::Collapse => AcceptedResult::collapse(n, entry.target),
                        FallbackKind::SingleCluster => AcceptedResult::single_cluster(n),
                    }
                }
            })
            .collect();

        SlotRun {
            accepted,
            slots,
            used_parallel,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{AcceptancePolicy, LabelSummary, ParameterGrid, shift_labels};

    #[test]
    fn grid_enumerates_axis_a_outer() {
        let grid = ParameterGrid::new(vec![10, 50], vec!['x', 'y', 'z']).expect("valid grid");
        let cells: Vec<(i32, char)> = grid.cells().map(|(a, b)| (*a, *b)).collect();
        assert_eq!(
            cells,
            vec![
                (10, 'x'),
                (10, 'y'),
                (10, 'z'),
                (50, 'x'),
                (50, 'y'),
                (50, 'z')
            ]
        );
        assert_eq!(grid.len(), 6);
        assert!(!grid.is_empty());
    }

    #[test]
    fn grid_rejects_empty_axes() {
        let err = ParameterGrid::<u32, u32>::new(vec![], vec![1]).expect_err("empty axis_a");
        assert!(err.to_string().contains("0 x 1"));
        assert!(ParameterGrid::<u32, u32>::new(vec![1], vec![]).is_err());
    }

    #[test]
    fn shift_labels_converts_to_one_based_and_checks_length() {
        assert_eq!(shift_labels(vec![0, 2, 1], 3).expect("valid"), vec![1, 3, 2]);
        let err = shift_labels(vec![0, 1], 3).expect_err("short labeling must fail");
        assert!(err.to_string().contains("expected n=3"));
        assert!(shift_labels(vec![usize::MAX], 1).is_err());
    }

    #[test]
    fn label_summary_counts_distinct_values() {
        let summary = LabelSummary::of(&[3, 1, 3, 2, 1]);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 3);
        assert_eq!(summary.distinct, 3);
    }

    #[test]
    fn policy_names_are_stable() {
        assert_eq!(AcceptancePolicy::Fixed.to_string(), "fixed");
        assert_eq!(AcceptancePolicy::LastWins.as_str(), "last_wins");
        assert_eq!(AcceptancePolicy::FirstWins.as_str(), "first_wins");
    }
}
