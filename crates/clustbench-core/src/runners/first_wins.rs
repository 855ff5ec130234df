// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use super::{
    AcceptancePolicy, LabelSummary, ParameterGrid, SlotRun, SlotRunner, SweepLedger, describe,
    run_attempt,
};
use crate::BenchError;
use crate::capability::Clusterer;
use crate::dataset::DatasetView;
use crate::diagnostics::FallbackKind;
use crate::execution_context::ExecutionContext;
use crate::repro::{DEFAULT_SEED, RandomState};
use crate::slots::{SLOT_COUNT, SlotTable};

/// Short-circuit grid sweep where the first qualifying attempt wins.
///
/// Iteration order is slot outer, axis A middle, axis B inner. An attempt
/// qualifies when its minimum label is 1, its maximum label is K, it has one
/// label per row, and it uses exactly K distinct labels. The first qualifying
/// attempt ends the sweep for that slot. Slots with no qualifying attempt are
/// labeled all ones. Always sequential.
#[derive(Clone, Debug)]
pub struct FirstWinsGridRunner<C: Clusterer, A, B> {
    clusterer: C,
    grid: ParameterGrid<A, B>,
    seed: Option<u64>,
}

impl<C, A, B> FirstWinsGridRunner<C, A, B>
where
    C: Clusterer,
    C::Params: From<(A, B)>,
    A: Clone,
    B: Clone,
{
    pub fn new(clusterer: C, grid: ParameterGrid<A, B>) -> Self {
        Self {
            clusterer,
            grid,
            seed: Some(DEFAULT_SEED),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn grid(&self) -> &ParameterGrid<A, B> {
        &self.grid
    }
}

fn qualifies(labels: &[usize], summary: LabelSummary, n: usize, k: usize) -> bool {
    summary.min == 1 && summary.max == k && labels.len() == n && summary.distinct == k
}

impl<C, A, B> SlotRunner for FirstWinsGridRunner<C, A, B>
where
    C: Clusterer,
    C::Params: From<(A, B)>,
    A: Clone + Send + Sync,
    B: Clone + Send + Sync,
{
    fn algorithm(&self) -> &'static str {
        self.clusterer.name()
    }

    fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::FirstWins
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn run(
        &self,
        data: &DatasetView<'_>,
        slots: &SlotTable,
        rng: &mut RandomState,
        ctx: &ExecutionContext<'_>,
    ) -> Result<SlotRun, BenchError> {
        let n = data.n();
        let mut ledger = SweepLedger::new(self.clusterer.name(), n, slots);

        for (done, (slot, k)) in slots.iter().enumerate() {
            'grid: for a in self.grid.axis_a() {
                for b in self.grid.axis_b() {
                    ctx.check_cancelled()?;
                    let params = C::Params::from((a.clone(), b.clone()));
                    let config = describe(&params);
                    match run_attempt(&self.clusterer, data, k, &params, self.seed, rng) {
                        Ok(labels) => {
                            let summary = LabelSummary::of(&labels);
                            if qualifies(&labels, summary, n, k) {
                                ledger.accept(slot, labels, config);
                                break 'grid;
                            }
                            ledger.record_rejection(slot, &config, summary);
                        }
                        Err(err) => ledger.record_failure(slot, &config, &err),
                    }
                }
            }
            ctx.report_cells(done + 1, SLOT_COUNT);
        }

        Ok(ledger.finish(FallbackKind::SingleCluster, false))
    }
}
