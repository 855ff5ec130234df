// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clustbench_core::{
    BenchError, BenchmarkDriver, Clusterer, DatasetView, ExecutionContext, FirstWinsGridRunner,
    FixedConfigRunner, LastWinsGridRunner, MIN_TARGET_CLUSTERS, ParameterGrid, RandomState,
    SLOT_COUNT, SlotRunner, TrueLabels, generate_slots,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use rand::Rng;

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

/// Behaves differently per (config, target) cell: fails, returns a valid
/// labeling, collapses to one label, or returns the wrong length.
struct MixedClusterer {
    salt: u8,
}

impl Clusterer for MixedClusterer {
    type Params = (u8, u8);

    fn name(&self) -> &'static str {
        "mixed"
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        let n = data.n();
        let mode = (usize::from(params.0) + usize::from(params.1) + n_clusters
            + usize::from(self.salt))
            % 5;
        match mode {
            0 => Err(BenchError::numerical_issue("scripted failure")),
            1 => Ok((0..n).map(|i| i % n_clusters).collect()),
            2 => Ok(vec![0; n]),
            3 => Ok(vec![0; n + 1]),
            _ => Ok((0..n).map(|_| rng.array().gen_range(0..n_clusters)).collect()),
        }
    }
}

fn assert_complete_matrix(
    runner: &dyn SlotRunner,
    values: &[f64],
    truth: &[usize],
) -> Result<(), TestCaseError> {
    let n = truth.len();
    let data = DatasetView::new(values, n, 1).map_err(|err| TestCaseError::fail(err.to_string()))?;
    let labels =
        TrueLabels::new(truth.to_vec()).map_err(|err| TestCaseError::fail(err.to_string()))?;
    let outcome = BenchmarkDriver::new(runner)
        .run(&data, &labels, &ExecutionContext::new())
        .map_err(|err| TestCaseError::fail(err.to_string()))?;

    let targets = outcome.matrix.targets();
    prop_assert_eq!(outcome.matrix.n_rows(), n);
    prop_assert_eq!(outcome.matrix.n_cols(), SLOT_COUNT);
    for (slot, &k) in targets.iter().enumerate() {
        let column = outcome.matrix.column(slot);
        prop_assert_eq!(column.len(), n);
        prop_assert!(column.iter().all(|&label| (1..=k).contains(&label)));
    }
    prop_assert_eq!(outcome.diagnostics.slots.len(), SLOT_COUNT);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        failure_persistence: Some(Box::new(FileFailurePersistence::Off)),
        .. ProptestConfig::default()
    })]

    #[test]
    fn slots_always_have_five_entries_of_at_least_two(k in 1usize..100_000) {
        let slots = generate_slots(k).expect("k >= 1 is valid");
        let targets = slots.targets();
        prop_assert_eq!(targets.len(), SLOT_COUNT);
        prop_assert!(targets.iter().all(|&target| target >= MIN_TARGET_CLUSTERS));
        prop_assert!(targets.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert_eq!(targets[2], k.max(MIN_TARGET_CLUSTERS));
        prop_assert_eq!(targets[4], k + 2);
    }

    #[test]
    fn seed_scopes_reproduce_and_restore(seed in any::<u64>(), outer in any::<u64>(), draws in 1usize..32) {
        let mut state = RandomState::from_seed(outer);
        let first: Vec<u64> = state.with_seed(Some(seed), |rng| {
            (0..draws).map(|_| rng.array().gen::<u64>() ^ rng.general().gen::<u64>()).collect()
        });
        let second: Vec<u64> = state.with_seed(Some(seed), |rng| {
            (0..draws).map(|_| rng.array().gen::<u64>() ^ rng.general().gen::<u64>()).collect()
        });
        prop_assert_eq!(first, second);

        let mut reference = RandomState::from_seed(outer);
        prop_assert_eq!(state.array().gen::<u64>(), reference.array().gen::<u64>());
        prop_assert_eq!(state.general().gen::<u64>(), reference.general().gen::<u64>());
    }

    #[test]
    fn every_runner_emits_a_complete_in_range_matrix(
        truth in prop::collection::vec(1usize..7, 1..24),
        salt in any::<u8>(),
    ) {
        let values: Vec<f64> = (0..truth.len()).map(|i| i as f64).collect();
        let grid = ParameterGrid::new(vec![0u8, 1, 2], vec![0u8, 3]).expect("valid grid");

        let fixed = FixedConfigRunner::new(MixedClusterer { salt }, (0, 0));
        assert_complete_matrix(&fixed, &values, &truth)?;

        let collapsing = FixedConfigRunner::new(MixedClusterer { salt }, (1, 1))
            .with_collapse_fallback(true);
        assert_complete_matrix(&collapsing, &values, &truth)?;

        let last_wins = LastWinsGridRunner::new(MixedClusterer { salt }, grid.clone());
        assert_complete_matrix(&last_wins, &values, &truth)?;

        let first_wins = FirstWinsGridRunner::new(MixedClusterer { salt }, grid);
        assert_complete_matrix(&first_wins, &values, &truth)?;
    }
}
