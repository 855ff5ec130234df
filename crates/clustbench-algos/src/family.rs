// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::birch::{BIRCH_BRANCHING_FACTORS, BIRCH_THRESHOLDS, Birch};
use crate::gmm::{GaussianMixture, GmmParams};
use crate::kmeans::{KMeans, KMeansParams};
use crate::spectral::{SPECTRAL_AFFINITIES, SPECTRAL_GAMMAS, Spectral};
use clustbench_core::{
    AcceptancePolicy, BenchError, BenchmarkDriver, BenchmarkOutcome, DatasetView,
    ExecutionContext, FirstWinsGridRunner, FixedConfigRunner, LastWinsGridRunner, ParameterGrid,
    SlotRunner, TrueLabels,
};
use std::fmt;
use std::str::FromStr;

/// Closed set of benchmarked clustering families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AlgorithmFamily {
    Birch,
    KMeans,
    Spectral,
    Gm,
}

impl AlgorithmFamily {
    pub const ALL: [Self; 4] = [Self::Birch, Self::KMeans, Self::Spectral, Self::Gm];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Birch => "birch",
            Self::KMeans => "kmeans",
            Self::Spectral => "spectral",
            Self::Gm => "gm",
        }
    }

    pub const fn policy(self) -> AcceptancePolicy {
        match self {
            Self::KMeans | Self::Gm => AcceptancePolicy::Fixed,
            Self::Birch => AcceptancePolicy::LastWins,
            Self::Spectral => AcceptancePolicy::FirstWins,
        }
    }

    /// Binds the family to its runner and configuration enumeration.
    pub fn build_runner(self, seed: Option<u64>) -> Result<Box<dyn SlotRunner>, BenchError> {
        let runner: Box<dyn SlotRunner> = match self {
            Self::KMeans => Box::new(
                FixedConfigRunner::new(KMeans, KMeansParams::default()).with_seed(seed),
            ),
            Self::Gm => Box::new(
                FixedConfigRunner::new(GaussianMixture, GmmParams::default())
                    .with_seed(seed)
                    .with_collapse_fallback(true),
            ),
            Self::Birch => {
                let grid = ParameterGrid::new(
                    BIRCH_BRANCHING_FACTORS.to_vec(),
                    BIRCH_THRESHOLDS.to_vec(),
                )?;
                Box::new(LastWinsGridRunner::new(Birch, grid).with_seed(seed))
            }
            Self::Spectral => {
                let grid =
                    ParameterGrid::new(SPECTRAL_AFFINITIES.to_vec(), SPECTRAL_GAMMAS.to_vec())?;
                Box::new(FirstWinsGridRunner::new(Spectral, grid).with_seed(seed))
            }
        };
        Ok(runner)
    }
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmFamily {
    type Err = BenchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.as_str() == raw)
            .ok_or_else(|| {
                BenchError::configuration(format!(
                    "unknown algorithm family '{raw}'; expected one of: birch, kmeans, spectral, gm"
                ))
            })
    }
}

/// Resolves `name` to a family and runs the full benchmark for it.
///
/// The name is resolved before any input is inspected, so an unknown family
/// fails without attempting a clustering.
pub fn run_family(
    name: &str,
    data: &DatasetView<'_>,
    truth: &TrueLabels,
    seed: Option<u64>,
    ctx: &ExecutionContext<'_>,
) -> Result<BenchmarkOutcome, BenchError> {
    let family: AlgorithmFamily = name.parse()?;
    let runner = family.build_runner(seed)?;
    BenchmarkDriver::new(runner.as_ref()).run(data, truth, ctx)
}

#[cfg(test)]
mod tests {
    use super::AlgorithmFamily;
    use clustbench_core::{AcceptancePolicy, BenchError};

    #[test]
    fn names_round_trip_through_from_str() {
        for family in AlgorithmFamily::ALL {
            let parsed: AlgorithmFamily = family.as_str().parse().expect("known family");
            assert_eq!(parsed, family);
        }
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let err = "dbscan"
            .parse::<AlgorithmFamily>()
            .expect_err("dbscan is not benchmarked");
        assert!(matches!(err, BenchError::Configuration(_)));
        assert!(err.to_string().contains("expected one of: birch, kmeans, spectral, gm"));
        assert!("KMeans".parse::<AlgorithmFamily>().is_err());
    }

    #[test]
    fn each_family_binds_its_policy() {
        for family in AlgorithmFamily::ALL {
            let runner = family.build_runner(Some(7)).expect("runner builds");
            assert_eq!(runner.policy(), family.policy());
            assert_eq!(runner.algorithm(), family.as_str());
            assert_eq!(runner.seed(), Some(7));
        }
        assert_eq!(AlgorithmFamily::Birch.policy(), AcceptancePolicy::LastWins);
        assert_eq!(AlgorithmFamily::Spectral.policy(), AcceptancePolicy::FirstWins);
        assert_eq!(AlgorithmFamily::Gm.policy(), AcceptancePolicy::Fixed);
    }
}
