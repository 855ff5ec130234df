// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::BenchError;
use crate::dataset::{DatasetView, TrueLabels};
use crate::diagnostics::{FallbackKind, RunDiagnostics};
use crate::execution_context::ExecutionContext;
use crate::repro::RandomState;
use crate::results::ResultMatrix;
use crate::runners::SlotRunner;
use crate::slots::generate_slots;
use std::borrow::Cow;
use std::time::Instant;

/// Result matrix plus the run's diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkOutcome {
    pub matrix: ResultMatrix,
    pub diagnostics: RunDiagnostics,
}

/// Derives the slot table from the ground truth, drives a runner over it and
/// assembles the N x 5 result matrix.
#[derive(Clone, Copy)]
pub struct BenchmarkDriver<'r> {
    runner: &'r dyn SlotRunner,
}

impl<'r> BenchmarkDriver<'r> {
    pub fn new(runner: &'r dyn SlotRunner) -> Self {
        Self { runner }
    }

    /// Runs from a fresh [`RandomState`].
    pub fn run(
        &self,
        data: &DatasetView<'_>,
        truth: &TrueLabels,
        ctx: &ExecutionContext<'_>,
    ) -> Result<BenchmarkOutcome, BenchError> {
        let mut rng = RandomState::default();
        self.run_with_state(data, truth, &mut rng, ctx)
    }

    pub fn run_with_state(
        &self,
        data: &DatasetView<'_>,
        truth: &TrueLabels,
        rng: &mut RandomState,
        ctx: &ExecutionContext<'_>,
    ) -> Result<BenchmarkOutcome, BenchError> {
        if truth.len() != data.n() {
            return Err(BenchError::data_shape(format!(
                "true labels have {} entries but the dataset has n={} rows",
                truth.len(),
                data.n()
            )));
        }
        let k = truth.ground_truth_k();
        let slots = generate_slots(k)?;
        let algorithm = self.runner.algorithm();
        let policy = self.runner.policy();

        tracing::info!(
            algorithm,
            policy = %policy,
            n = data.n(),
            d = data.d(),
            k,
            targets = ?slots.targets(),
            "starting benchmark sweep"
        );
        let started = Instant::now();

        let run = self.runner.run(data, &slots, rng, ctx)?;
        let matrix = ResultMatrix::new(&slots, run.accepted)?;
        let runtime_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let warnings = run
            .slots
            .iter()
            .filter_map(|slot| {
                slot.fallback.map(|fallback| {
                    let kind = match fallback {
                        FallbackKind::Collapse => "collapse",
                        FallbackKind::SingleCluster => "single-cluster",
                    };
                    format!(
                        "slot {} (K={}) resolved by {kind} fallback after {} attempts",
                        slot.slot, slot.target, slot.attempts
                    )
                })
            })
            .collect::<Vec<_>>();

        let diagnostics = RunDiagnostics {
            algorithm: Cow::Borrowed(algorithm),
            policy,
            seed: self.runner.seed(),
            n: data.n(),
            d: data.d(),
            ground_truth_k: k,
            slots: run.slots,
            runtime_ms: Some(runtime_ms),
            used_parallel: run.used_parallel,
            warnings,
            ..RunDiagnostics::default()
        };

        tracing::info!(
            algorithm,
            runtime_ms,
            attempts = diagnostics.total_attempts(),
            unsatisfied = diagnostics.warnings.len(),
            "benchmark sweep finished"
        );

        Ok(BenchmarkOutcome {
            matrix,
            diagnostics,
        })
    }
}

impl std::fmt::Debug for BenchmarkDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkDriver")
            .field("algorithm", &self.runner.algorithm())
            .field("policy", &self.runner.policy())
            .finish()
    }
}
