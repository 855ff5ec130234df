// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The four clustering families benchmarked by clustbench, each implementing
//! [`clustbench_core::Clusterer`], plus the closed family selector that binds
//! each family to its acceptance-policy runner.

pub mod birch;
pub mod family;
pub mod gmm;
pub mod kmeans;
pub mod linalg;
pub mod spectral;

pub use birch::{BIRCH_BRANCHING_FACTORS, BIRCH_THRESHOLDS, Birch, BirchParams};
pub use family::{AlgorithmFamily, run_family};
pub use gmm::{GaussianMixture, GmmParams};
pub use kmeans::{KMeans, KMeansParams};
pub use spectral::{Affinity, SPECTRAL_AFFINITIES, SPECTRAL_GAMMAS, Spectral, SpectralParams};
