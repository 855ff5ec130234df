// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use super::{
    AcceptancePolicy, LabelSummary, SlotRun, SlotRunner, SweepLedger, describe, run_attempt,
};
use crate::BenchError;
use crate::capability::Clusterer;
use crate::dataset::DatasetView;
use crate::diagnostics::FallbackKind;
use crate::execution_context::ExecutionContext;
use crate::repro::{DEFAULT_SEED, RandomState};
use crate::slots::{SLOT_COUNT, SlotTable};

/// One attempt per slot under a single canonical configuration.
///
/// The same seed is reused for every slot. With the collapse fallback
/// enabled, an attempt whose distinct label count differs from the slot's
/// target K is discarded and every point is labeled K. A failed attempt is
/// replaced by the runner's fallback: constant K with the collapse fallback,
/// all ones without it.
#[derive(Clone, Debug)]
pub struct FixedConfigRunner<C: Clusterer> {
    clusterer: C,
    params: C::Params,
    seed: Option<u64>,
    collapse_fallback: bool,
}

impl<C: Clusterer> FixedConfigRunner<C> {
    pub fn new(clusterer: C, params: C::Params) -> Self {
        Self {
            clusterer,
            params,
            seed: Some(DEFAULT_SEED),
            collapse_fallback: false,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_collapse_fallback(mut self, enabled: bool) -> Self {
        self.collapse_fallback = enabled;
        self
    }

    pub fn params(&self) -> &C::Params {
        &self.params
    }

    pub fn collapse_fallback(&self) -> bool {
        self.collapse_fallback
    }

    fn fallback_kind(&self) -> FallbackKind {
        if self.collapse_fallback {
            FallbackKind::Collapse
        } else {
            FallbackKind::SingleCluster
        }
    }
}

impl<C: Clusterer> SlotRunner for FixedConfigRunner<C> {
    fn algorithm(&self) -> &'static str {
        self.clusterer.name()
    }

    fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::Fixed
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
        let config = describe(&self.params);
        let mut ledger = SweepLedger::new(self.clusterer.name(), data.n(), slots);

        for (done, (slot, k)) in slots.iter().enumerate() {
            ctx.check_cancelled()?;
            match run_attempt(&self.clusterer, data, k, &self.params, self.seed, rng) {
                Ok(labels) => {
                    let summary = LabelSummary::of(&labels);
                    let collapsed = self.collapse_fallback && summary.distinct != k;
                    if collapsed || summary.max > k {
                        ledger.record_rejection(slot, &config, summary);
                    } else {
                        ledger.accept(slot, labels, config.clone());
                    }
                }
                Err(err) => ledger.record_failure(slot, &config, &err),
            }
            ctx.report_cells(done + 1, SLOT_COUNT);
        }

        Ok(ledger.finish(self.fallback_kind(), false))
    }
}
