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
use crate::slots::{KSlot, SLOT_COUNT, SlotTable};

/// Exhaustive grid sweep where the last qualifying attempt wins.
///
/// Iteration order is axis A outer, axis B middle, slot inner. An attempt
/// qualifies when its maximum 1-based label equals the slot's target K, and a
/// qualifying attempt always replaces the slot's earlier result. Slots with no
/// qualifying attempt are labeled all ones.
///
/// With the `rayon` feature, a pinned seed and a context that allows it, the
/// cells run concurrently, each on its own freshly seeded [`RandomState`];
/// outcomes are folded in enumeration order so the accepted results match
/// the sequential sweep.
#[derive(Clone, Debug)]
pub struct LastWinsGridRunner<C: Clusterer, A, B> {
    clusterer: C,
    grid: ParameterGrid<A, B>,
    seed: Option<u64>,
}

impl<C, A, B> LastWinsGridRunner<C, A, B>
where
    C: Clusterer,
    C::Params: From<(A, B)>,
    A: Clone + Send + Sync,
    B: Clone + Send + Sync,
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

    /// Parameters for every grid cell in enumeration order.
    fn cell_params(&self) -> Vec<C::Params> {
        self.grid
            .cells()
            .map(|(a, b)| C::Params::from((a.clone(), b.clone())))
            .collect()
    }

    fn fold(
        ledger: &mut SweepLedger,
        slot: KSlot,
        target: usize,
        config: &str,
        outcome: Result<Vec<usize>, BenchError>,
    ) {
        match outcome {
            Ok(labels) => {
                let summary = LabelSummary::of(&labels);
                if summary.max == target {
                    ledger.accept(slot, labels, config.to_string());
                } else {
                    ledger.record_rejection(slot, config, summary);
                }
            }
            Err(err) => ledger.record_failure(slot, config, &err),
        }
    }

    fn run_sequential(
        &self,
        data: &DatasetView<'_>,
        slots: &SlotTable,
        rng: &mut RandomState,
        ctx: &ExecutionContext<'_>,
    ) -> Result<SlotRun, BenchError> {
        let mut ledger = SweepLedger::new(self.clusterer.name(), data.n(), slots);
        let total = self.grid.len() * SLOT_COUNT;
        let mut done = 0;

        for params in self.cell_params() {
            let config = describe(&params);
            for (slot, k) in slots.iter() {
                ctx.check_cancelled()?;
                let outcome = run_attempt(&self.clusterer, data, k, &params, self.seed, rng);
                Self::fold(&mut ledger, slot, k, &config, outcome);
                done += 1;
                ctx.report_cells(done, total);
            }
        }

        Ok(ledger.finish(FallbackKind::SingleCluster, false))
    }

    #[cfg(feature = "rayon")]
    fn run_parallel(
        &self,
        data: &DatasetView<'_>,
        slots: &SlotTable,
        seed: u64,
        ctx: &ExecutionContext<'_>,
    ) -> Result<SlotRun, BenchError> {
        use rayon::prelude::*;

        ctx.check_cancelled()?;
        let params = self.cell_params();
        let cells: Vec<(usize, KSlot, usize)> = (0..params.len())
            .flat_map(|cell| slots.iter().map(move |(slot, k)| (cell, slot, k)))
            .collect();

        let outcomes = cells
            .par_iter()
            .map(|&(cell, _, k)| {
                ctx.check_cancelled()?;
                let mut state = RandomState::from_seed(seed);
                Ok(run_attempt(
                    &self.clusterer,
                    data,
                    k,
                    &params[cell],
                    None,
                    &mut state,
                ))
            })
            .collect::<Result<Vec<_>, BenchError>>()?;

        let mut ledger = SweepLedger::new(self.clusterer.name(), data.n(), slots);
        let configs: Vec<String> = params.iter().map(describe).collect();
        let total = cells.len();
        for (done, (&(cell, slot, k), outcome)) in cells.iter().zip(outcomes).enumerate() {
            Self::fold(&mut ledger, slot, k, &configs[cell], outcome);
            ctx.report_cells(done + 1, total);
        }

        Ok(ledger.finish(FallbackKind::SingleCluster, true))
    }
}

impl<C, A, B> SlotRunner for LastWinsGridRunner<C, A, B>
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
        AcceptancePolicy::LastWins
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
        #[cfg(feature = "rayon")]
        {
            if let Some(seed) = self.seed.filter(|_| ctx.allows_parallel()) {
                return self.run_parallel(data, slots, seed, ctx);
            }
        }
        self.run_sequential(data, slots, rng, ctx)
    }
}
